//! The source obfuscates broker contact links behind its CDN's
//! email-protection encoding. Brittle external contract; a format change
//! should only ever touch this file.

/// Decode a protected email href. The fragment after `#` is hex: the first
/// pair is an XOR key applied over the remaining pairs. A query-string
/// suffix left inside the plaintext is stripped.
pub fn decode_protected_email(href: &str) -> Option<String> {
    let encoded = href.rsplit('#').next()?;
    let decoded = decode_hex_xor(encoded)?;
    let email = decoded.split('?').next().unwrap_or(decoded.as_str());
    if email.contains('@') {
        Some(email.to_string())
    } else {
        None
    }
}

fn decode_hex_xor(s: &str) -> Option<String> {
    if !s.is_ascii() || s.len() < 4 || s.len() % 2 != 0 {
        return None;
    }
    let key = u8::from_str_radix(&s[..2], 16).ok()?;
    let mut out = Vec::with_capacity(s.len() / 2 - 1);
    let mut i = 2;
    while i < s.len() {
        let byte = u8::from_str_radix(&s[i..i + 2], 16).ok()?;
        out.push(byte ^ key);
        i += 2;
    }
    String::from_utf8(out).ok()
}

/// Phone links are plain `tel:` hrefs.
pub fn strip_tel(href: &str) -> Option<String> {
    let phone = href.strip_prefix("tel:").unwrap_or(href).trim();
    if phone.is_empty() { None } else { Some(phone.to_string()) }
}
