use std::io;
use std::path::{Path, PathBuf};

use rand::{distr::Alphanumeric, Rng};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::forms::Upload;

/// Directory under the media root that post images go into.
pub const POST_IMAGES_DIR: &str = "posts";

const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Writes the upload under `<root>/<dir>/` and returns its name relative
    /// to the root, e.g. `posts/small.gif`. An existing file is never
    /// overwritten: the new one gets a random suffix instead.
    pub async fn save(&self, dir: &str, upload: &Upload) -> io::Result<String> {
        let target_dir = self.root.join(dir);
        fs::create_dir_all(&target_dir).await?;

        let sanitized = sanitize_filename(&upload.filename);
        let (stem, ext) = split_name(&sanitized);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{stem}{ext}")
            } else {
                format!("{stem}_{}{ext}", random_suffix())
            };

            let file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(target_dir.join(&file_name))
                .await;

            match file {
                Ok(mut file) => {
                    file.write_all(&upload.data).await?;
                    file.flush().await?;
                    return Ok(format!("{dir}/{file_name}"));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find a free file name",
        ))
    }

    pub async fn delete(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path_of(name)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect()
}

/// Keeps only the final path component and replaces anything outside
/// `[A-Za-z0-9._-]`.
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn scratch_root() -> PathBuf {
        std::env::temp_dir().join(format!("yatube-media-{}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_filename("small.gif"), "small.gif");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\pics\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "image");
        assert_eq!(split_name("a.b.gif"), ("a.b", ".gif"));
        assert_eq!(split_name("noext"), ("noext", ""));
    }

    #[tokio::test]
    async fn saves_with_sanitized_name() {
        let storage = MediaStorage::new(scratch_root());
        let upload = Upload {
            filename: "../../uploads/my cat.gif".into(),
            data: Bytes::from_static(b"GIF89a"),
        };

        let name = storage.save(POST_IMAGES_DIR, &upload).await.unwrap();

        assert_eq!(name, "posts/my_cat.gif");
        assert!(storage.path_of(&name).exists());
        fs::remove_dir_all(storage.root()).await.unwrap();
    }

    #[tokio::test]
    async fn saves_under_posts_and_never_overwrites() {
        let storage = MediaStorage::new(scratch_root());
        let upload = Upload {
            filename: "small.gif".into(),
            data: Bytes::from_static(b"GIF89a"),
        };

        let first = storage.save(POST_IMAGES_DIR, &upload).await.unwrap();
        let second = storage.save(POST_IMAGES_DIR, &upload).await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_") && second.ends_with(".gif"));
        assert_eq!(
            fs::read(storage.path_of(&first)).await.unwrap(),
            b"GIF89a".to_vec()
        );

        storage.delete(&first).await.unwrap();
        storage.delete(&first).await.unwrap();
        fs::remove_dir_all(storage.root()).await.unwrap();
    }
}
