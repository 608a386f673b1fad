use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Flat directory of named files: uploads and their translated outputs, or
/// profile photos. Names handed to this store are already sanitized.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Artifact directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Saves bytes under `{prefix}{timestamp}_{name}`, adding a counter when
    /// that name is already taken. Returns the stored name.
    pub async fn save_new(&self, prefix: &str, name: &str, at: DateTime<Utc>, bytes: &[u8]) -> Result<String> {
        let stamp = at.format("%Y%m%d_%H%M%S");
        let mut attempt = 0u32;
        loop {
            let stored = match attempt {
                0 => format!("{prefix}{stamp}_{name}"),
                n => format!("{prefix}{stamp}_{n}_{name}"),
            };
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.path(&stored))
                .await;
            match opened {
                Ok(mut file) => {
                    if let Err(e) = write_and_flush(&mut file, bytes).await {
                        drop(file);
                        self.delete(&stored).await.ok();
                        return Err(e);
                    }
                    debug!("Saved {} ({} bytes)", stored, bytes.len());
                    return Ok(stored);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < 100 => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Creates or replaces `name`.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut file = fs::File::create(self.path(name)).await?;
        write_and_flush(&mut file, bytes).await
    }

    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removing a file that is already gone is not an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)).await {
            Ok(()) => {
                debug!("Deleted {}", name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_and_flush(file: &mut fs::File, bytes: &[u8]) -> Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

/// Reduces a client-supplied filename to `[A-Za-z0-9._-]`, with whitespace
/// turned into underscores and no leading dots or underscores. May return an
/// empty string.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Lowercased extension after the last dot, if any.
pub fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

pub fn has_allowed_extension(name: &str, allowed: &[&str]) -> bool {
    extension(name).is_some_and(|ext| allowed.contains(&ext.as_str()))
}

/// Output artifact name, keyed by the translation id so two uploads with the
/// same stored name never share an output.
pub fn output_artifact_name(translation_id: i64, stored_name: &str) -> String {
    format!("translated_{translation_id}_{stored_name}")
}

/// True for names this service could have produced.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && sanitize_filename(name) == name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("my report (final).json"), "my_report_final.json");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("文字.txt"), "txt");
        assert_eq!(sanitize_filename("///"), "");
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(has_allowed_extension("Doc.JSON", &["txt", "json"]));
        assert!(has_allowed_extension("a.b.txt", &["txt", "json"]));
        assert!(!has_allowed_extension("archive.zip", &["txt", "json"]));
        assert!(!has_allowed_extension("README", &["txt", "json"]));
    }

    #[test]
    fn safe_names_match_their_sanitized_form() {
        assert!(is_safe_name("translated_4_20240101_120000_doc.txt"));
        assert!(!is_safe_name("../secret.txt"));
        assert!(!is_safe_name(""));
    }

    #[tokio::test]
    async fn save_new_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf()).await.unwrap();
        let at = Utc::now();

        let first = store.save_new("", "doc.txt", at, b"one").await.unwrap();
        let second = store.save_new("", "doc.txt", at, b"two").await.unwrap();
        assert_ne!(first, second);
        assert!(first.ends_with("_doc.txt"));

        assert_eq!(store.read(&first).await.unwrap().unwrap(), b"one");
        assert_eq!(store.read(&second).await.unwrap().unwrap(), b"two");

        store.delete(&first).await.unwrap();
        store.delete(&first).await.unwrap();
        assert!(store.read(&first).await.unwrap().is_none());
    }
}
