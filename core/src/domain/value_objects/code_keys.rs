//! Store keys derived from a (business domain, recipient) pair.

use std::borrow::Cow;

/// Appended to the code key to address the attempt counter
pub const COUNTER_SUFFIX: &str = ":cnt";

/// The pair of keys a verification code occupies in the store
///
/// Segments are escaped (`\` as `\\`, `:` as `\:`), so a code key always
/// has exactly one unescaped separator after the prefix and a counter key
/// has two. Distinct pairs therefore never share a key and a code key never
/// equals any counter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeKeys {
    /// Key of the [`CodeEntry`](crate::domain::entities::CodeEntry)
    pub code: String,
    /// Key of the [`AttemptCounter`](crate::domain::entities::AttemptCounter)
    pub counter: String,
}

impl CodeKeys {
    pub fn derive(prefix: &str, biz: &str, phone: &str) -> Self {
        let code = format!("{}:{}:{}", prefix, escape_segment(biz), escape_segment(phone));
        let counter = format!("{}{}", code, COUNTER_SUFFIX);
        Self { code, counter }
    }
}

fn escape_segment(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\\', ':']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 4);
    for c in raw.chars() {
        if c == '\\' || c == ':' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}
