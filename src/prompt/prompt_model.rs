use serde::{Deserialize, Serialize};

/// Named fragments of one rendered prompt, kept for audit and storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubPromptSet {
    pub global: String,
    pub components: Vec<String>,
    pub adjacents: Vec<String>,
    pub restrictive: String,
    pub guiding: String,
    /// All fragments joined with single spaces.
    pub full: String,
}

impl SubPromptSet {
    /// SHA-1 of the full prompt, hex encoded.
    pub fn digest(&self) -> String {
        use sha1::{Digest, Sha1};

        let mut hasher = Sha1::new();
        hasher.update(self.full.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
