use chrono::{DateTime, Utc};
use rand::Rng;

use super::models::{DomainEntry, StoredEntry};

/// Length of a verification code
pub const CODE_LENGTH: usize = 8;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fresh random verification code: 8 characters of `A-Z0-9`
pub fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Bring stored registry elements to the current record shape.
///
/// Bare domain names become full records with a code from `new_code` and
/// `now` as their creation time. The flag reports whether anything had to be
/// upgraded, i.e. whether the caller must write the list back.
pub(crate) fn upgrade(
    stored: Vec<StoredEntry>,
    now: DateTime<Utc>,
    mut new_code: impl FnMut() -> String,
) -> (Vec<DomainEntry>, bool) {
    let mut changed = false;

    let entries = stored
        .into_iter()
        .map(|entry| match entry {
            StoredEntry::Record(record) => record,
            StoredEntry::Bare(domain) => {
                changed = true;
                DomainEntry { domain, verification_code: new_code(), added_at: now }
            }
        })
        .collect();

    (entries, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_upgrade_bare_names() {
        let now = Utc::now();
        let stored = vec![
            StoredEntry::Bare("a.example".to_string()),
            StoredEntry::Bare("b.example".to_string()),
        ];

        let mut counter = 0;
        let (entries, changed) = upgrade(stored, now, || {
            counter += 1;
            format!("CODE000{counter}")
        });

        assert!(changed);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].domain, "a.example");
        assert_eq!(entries[0].verification_code, "CODE0001");
        assert_eq!(entries[1].verification_code, "CODE0002");
        assert_eq!(entries[1].added_at, now);
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let now = Utc::now();
        let (first, _) = upgrade(vec![StoredEntry::Bare("a.example".to_string())], now, || {
            "AAAA1111".to_string()
        });

        let stored = first.iter().cloned().map(StoredEntry::Record).collect();
        let (second, changed) =
            upgrade(stored, now, || panic!("no code should be generated for current records"));

        assert!(!changed);
        assert_eq!(first, second);
    }
}
