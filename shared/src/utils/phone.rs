//! Log-safe rendering of recipients

const MASK: &str = "****";
const VISIBLE_HEAD: usize = 3;
const VISIBLE_TAIL: usize = 4;

/// Mask a recipient for logging, e.g. `138****5678`
///
/// Separators are dropped before masking. Email addresses keep the first
/// character of the local part and the domain; anything with fewer than
/// eight digits is masked entirely.
pub fn mask_phone_number(recipient: &str) -> String {
    if let Some((local, domain)) = recipient.rsplit_once('@') {
        let head: String = local.chars().take(1).collect();
        return format!("{}***@{}", head, domain);
    }

    let digits: Vec<char> = recipient
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if digits.len() <= VISIBLE_HEAD + VISIBLE_TAIL {
        return MASK.to_string();
    }

    let head: String = digits[..VISIBLE_HEAD].iter().collect();
    let tail: String = digits[digits.len() - VISIBLE_TAIL..].iter().collect();
    format!("{}{}{}", head, MASK, tail)
}
