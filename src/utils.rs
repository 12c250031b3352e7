use log::info;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const CACHE_DIR_NAME: &str = "mesodb";

pub fn get_cache_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "Cache path exists but is not a directory: {}",
                        path.display()
                    ),
                ));
            }
            info!("Existing cache directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

pub(crate) async fn file_exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}
