use crate::{Result, StackError};
use std::path::{Path, PathBuf};

/// 归档完整性检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    /// 解压后的总字节数
    pub unpacked_bytes: u64,
    /// 归档文件本身的大小
    pub archive_bytes: u64,
}

/// 遍历 `.tar.gz` 的全部条目以验证其完整性
pub async fn inspect_archive(path: &Path) -> Result<ArchiveSummary> {
    let path = path.to_path_buf();
    let archive_bytes = tokio::fs::metadata(&path).await?.len();

    // 在后台线程中执行解压遍历，避免阻塞异步运行时
    tokio::task::spawn_blocking(move || {
        use flate2::read::GzDecoder;
        use std::fs::File;
        use tar::Archive;

        let file = File::open(&path)?;
        let mut archive = Archive::new(GzDecoder::new(file));

        let mut entries = 0usize;
        let mut unpacked_bytes = 0u64;
        for entry in archive.entries()? {
            let entry = entry.map_err(|e| {
                StackError::invalid_backup_set(format!("归档损坏 {}: {e}", path.display()))
            })?;
            entries += 1;
            unpacked_bytes += entry.header().size().unwrap_or(0);
        }

        Ok::<ArchiveSummary, StackError>(ArchiveSummary {
            path,
            entries,
            unpacked_bytes,
            archive_bytes,
        })
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::File;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_inspect_counts_entries() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        std::fs::create_dir_all(source.join("blobs")).unwrap();
        std::fs::write(source.join("webui.db"), b"sqlite").unwrap();
        std::fs::write(source.join("blobs/sha256-1"), vec![7u8; 1024]).unwrap();

        let archive_path = dir.path().join("webui-data_20250101_000000.tar.gz");
        let encoder = GzEncoder::new(File::create(&archive_path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", &source).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let summary = inspect_archive(&archive_path).await.unwrap();
        assert!(summary.entries >= 3);
        assert_eq!(summary.unpacked_bytes, 1024 + 6);
        assert!(summary.archive_bytes > 0);
    }

    #[tokio::test]
    async fn test_truncated_archive_is_rejected() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("models_20250101_000000.tar.gz");
        std::fs::write(&archive_path, b"\x1f\x8b\x08\x00garbage").unwrap();

        assert!(inspect_archive(&archive_path).await.is_err());
    }
}
