use rand::Rng;

// No 0/O or 1/I so codes survive being read aloud or retyped.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GROUPS: usize = 3;
const GROUP_LEN: usize = 4;

/// Retries allowed when a generated code is already taken.
pub const MAX_CODE_ATTEMPTS: usize = 8;

/// Source of candidate verification codes. Uniqueness is checked by the store.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct RandomCodes {
    prefix: String,
}

impl RandomCodes {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_ascii_uppercase(),
        }
    }
}

impl Default for RandomCodes {
    fn default() -> Self {
        Self::new("CERT")
    }
}

impl CodeGenerator for RandomCodes {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let mut code = self.prefix.clone();
        for _ in 0..GROUPS {
            code.push('-');
            for _ in 0..GROUP_LEN {
                code.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
            }
        }
        code
    }
}

/// Normalises user-typed codes before lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_shape() {
        let code = RandomCodes::new("ACME").generate();
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 1 + GROUPS);
        assert_eq!(parts[0], "ACME");
        for group in &parts[1..] {
            assert_eq!(group.len(), GROUP_LEN);
            assert!(group.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn codes_vary() {
        let codes = RandomCodes::default();
        assert_ne!(codes.generate(), codes.generate());
    }

    #[test]
    fn normalizes_lookup_input() {
        assert_eq!(normalize_code("  cert-abcd-efgh-jkmn "), "CERT-ABCD-EFGH-JKMN");
    }
}
