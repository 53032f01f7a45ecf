//! Option list parsing
//!
//! Option lists are whitespace-separated `key=value` pairs. A value that
//! contains whitespace is wrapped in braces: `fitmethod=meet boxsize={595 842}`.
//! A bare key is a boolean switch: `adjustpage` means `adjustpage=true`.

/// A parsed option list. Later occurrences of a key win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    entries: Vec<(String, String)>,
}

impl OptionList {
    /// Parse an option list. Keys are case-insensitive and stored lower-case.
    pub fn parse(optlist: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        let mut chars = optlist.char_indices().peekable();

        loop {
            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
            let Some(&(start, _)) = chars.peek() else {
                break;
            };

            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if c == '=' || c.is_whitespace() {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let key = optlist[start..end].to_ascii_lowercase();
            if key.is_empty() {
                return Err(format!("Option list '{optlist}' has a value without a key"));
            }

            if chars.next_if(|&(_, c)| c == '=').is_none() {
                entries.push((key, "true".to_string()));
                continue;
            }

            let value = match chars.peek() {
                Some(&(open, '{')) => {
                    chars.next();
                    let mut depth = 1usize;
                    let mut close = None;
                    for (i, c) in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    close = Some(i);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let close =
                        close.ok_or_else(|| format!("Unbalanced braces in option '{key}'"))?;
                    optlist[open + 1..close].to_string()
                }
                Some(&(value_start, _)) => {
                    let mut value_end = value_start;
                    while let Some(&(i, c)) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value_end = i + c.len_utf8();
                        chars.next();
                    }
                    optlist[value_start..value_end].to_string()
                }
                None => return Err(format!("Missing value for option '{key}'")),
            };

            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    /// Value of the last occurrence of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over all `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
