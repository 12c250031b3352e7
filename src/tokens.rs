//! API tokens persisted next to the cache, one per line.

use crate::error::MesoDbError;
use log::info;
use std::path::{Path, PathBuf};
use tokio::fs;

const TOKENS_FILE_NAME: &str = ".tokens";

#[derive(Debug, Clone, PartialEq)]
pub struct TokenStore {
    path: PathBuf,
    tokens: Vec<String>,
}

impl TokenStore {
    pub fn file_path(cache_dir: &Path) -> PathBuf {
        cache_dir.join(TOKENS_FILE_NAME)
    }

    /// Reads `<cache_dir>/.tokens`. A missing file means no tokens yet.
    pub async fn load(cache_dir: &Path) -> Result<Self, MesoDbError> {
        let path = Self::file_path(cache_dir);
        let tokens = match fs::read_to_string(&path).await {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(MesoDbError::TokenRead(path, e)),
        };
        Ok(Self { path, tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Appends the tokens not stored yet, in order, and persists the union.
    ///
    /// Returns how many were new. Nothing is written while the union is empty.
    pub async fn add_tokens<I, S>(&mut self, tokens: I) -> Result<usize, MesoDbError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.tokens.len();
        for token in tokens {
            let token = token.as_ref().trim();
            if !token.is_empty() && !self.tokens.iter().any(|t| t == token) {
                self.tokens.push(token.to_string());
            }
        }
        let added = self.tokens.len() - before;
        if added > 0 {
            let mut text = self.tokens.join("\n");
            text.push('\n');
            fs::write(&self.path, text)
                .await
                .map_err(|e| MesoDbError::TokenWrite(self.path.clone(), e))?;
            info!("Saved {} tokens to {}", self.tokens.len(), self.path.display());
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::load(dir.path()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_dedups_and_persists_union() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(TokenStore::file_path(dir.path()), "a\n\n b \n")
            .await
            .unwrap();

        let mut store = TokenStore::load(dir.path()).await.unwrap();
        assert_eq!(store.tokens(), ["a", "b"]);

        let added = store.add_tokens(["b", "c", "c", ""]).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.tokens(), ["a", "b", "c"]);

        let reloaded = TokenStore::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.tokens(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_nothing_written_without_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TokenStore::load(dir.path()).await.unwrap();
        assert_eq!(store.add_tokens(Vec::<String>::new()).await.unwrap(), 0);
        assert!(!store.path().exists());
    }
}
