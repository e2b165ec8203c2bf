//! Small shared helpers.

/// Format a caps amount with space-separated thousands groups, the way the
/// meter renders it.
///
/// # Examples
///
/// ```
/// use capchat::util::format_caps;
///
/// assert_eq!(format_caps(10_000), "10 000");
/// assert_eq!(format_caps(9_995), "9 995");
/// assert_eq!(format_caps(-1_250), "-1 250");
/// ```
pub fn format_caps(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
