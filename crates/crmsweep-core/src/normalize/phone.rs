/// Minimum digit count for a phone number to serve as an exact identity key.
pub const MIN_EXACT_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    /// All digits after stripping any international dialing prefix.
    pub full: String,
    /// `full` minus the leading `1` for 11-digit NANP numbers.
    pub national: String,
    /// Whether the raw value carried a `+`, `00` or `011` prefix.
    pub is_international: bool,
}

impl PhoneNumber {
    /// The value exact matching groups on, or `None` when the number is too
    /// short to be usable. International numbers key on the national form so
    /// `+1 415...` and `415...` land on the same key.
    pub fn exact_key(&self) -> Option<&str> {
        if self.full.len() < MIN_EXACT_DIGITS {
            return None;
        }
        if self.is_international {
            Some(&self.national)
        } else {
            Some(&self.full)
        }
    }
}

pub fn normalize_phone(value: &str) -> PhoneNumber {
    let trimmed = value.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|ch| ch.is_ascii_digit()).collect();

    let (full, is_international) = if has_plus {
        (digits, true)
    } else if let Some(rest) = digits.strip_prefix("011") {
        (rest.to_string(), true)
    } else if let Some(rest) = digits.strip_prefix("00") {
        (rest.to_string(), true)
    } else {
        (digits, false)
    };

    let national = if full.len() == 11 && full.starts_with('1') {
        full[1..].to_string()
    } else {
        full.clone()
    };

    PhoneNumber {
        full,
        national,
        is_international,
    }
}
