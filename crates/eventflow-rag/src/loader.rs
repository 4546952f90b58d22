use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ServiceError;
use crate::services::{DocumentLoader, ServiceFuture};
use crate::types::Chunk;

/// Loads text files under a directory, recursively, and splits them into
/// chunks of at most `chunk_size` characters.
///
/// Chunk boundaries fall on paragraph breaks where possible, then on
/// whitespace. A single word longer than `chunk_size` becomes its own chunk.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
  extensions: Vec<String>,
  chunk_size: usize,
}

impl DirectoryLoader {
  pub fn new(extensions: Vec<String>, chunk_size: usize) -> Self {
    Self {
      extensions: extensions
        .into_iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect(),
      chunk_size: chunk_size.max(1),
    }
  }

  fn wanted(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
  }

  async fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>, ServiceError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
      let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_error(&dir))?;
      while let Some(entry) = entries.next_entry().await.map_err(io_error(&dir))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(io_error(&path))?;
        if file_type.is_dir() {
          pending.push(path);
        } else if file_type.is_file() && self.wanted(&path) {
          files.push(path);
        }
      }
    }
    files.sort();
    Ok(files)
  }

  fn split(&self, text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
      for word in paragraph.split_whitespace() {
        let needed = if current.is_empty() {
          word.chars().count()
        } else {
          current.chars().count() + 1 + word.chars().count()
        };
        if needed > self.chunk_size && !current.is_empty() {
          chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() && !current.ends_with('\n') {
          current.push(' ');
        }
        current.push_str(word);
      }
      // Paragraph break: close the chunk if another paragraph cannot fit.
      if current.chars().count() * 2 > self.chunk_size {
        chunks.push(std::mem::take(&mut current));
      } else if !current.is_empty() {
        current.push('\n');
      }
    }

    let tail = current.trim_end();
    if !tail.is_empty() {
      chunks.push(tail.to_string());
    }
    chunks
      .into_iter()
      .map(|c| c.trim_end().to_string())
      .collect()
  }
}

impl DocumentLoader for DirectoryLoader {
  fn load<'a>(&'a self, dir: &'a Path) -> ServiceFuture<'a, Vec<Chunk>> {
    Box::pin(async move {
      let files = self.collect_files(dir).await?;
      let mut chunks = Vec::new();

      for path in files {
        let text = tokio::fs::read_to_string(&path)
          .await
          .map_err(io_error(&path))?;
        let name = path
          .strip_prefix(dir)
          .unwrap_or(&path)
          .components()
          .map(|c| c.as_os_str().to_string_lossy())
          .collect::<Vec<_>>()
          .join("/");
        let pieces = self.split(&text);
        debug!(file = %path.display(), chunks = pieces.len(), "loaded document");

        chunks.extend(pieces.into_iter().enumerate().map(|(n, text)| Chunk {
          id: format!("{name}#{n}"),
          source: path.display().to_string(),
          text,
        }));
      }

      if chunks.is_empty() {
        return Err(ServiceError::EmptyCorpus {
          path: dir.to_path_buf(),
        });
      }
      Ok(chunks)
    })
  }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ServiceError + use<> {
  let path = path.to_path_buf();
  move |source| ServiceError::Io { path, source }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn loader(chunk_size: usize) -> DirectoryLoader {
    DirectoryLoader::new(vec!["txt".to_string(), ".MD".to_string()], chunk_size)
  }

  #[test]
  fn test_split_respects_chunk_size() {
    let text = "one two three four five six seven eight nine ten";
    let chunks = loader(12).split(text);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    assert_eq!(chunks.join(" "), text);
  }

  #[test]
  fn test_split_keeps_short_paragraphs_together() {
    let chunks = loader(1024).split("First paragraph.\n\nSecond paragraph.");
    assert_eq!(chunks, vec!["First paragraph.\nSecond paragraph.".to_string()]);
  }

  #[test]
  fn test_split_oversized_word_stands_alone() {
    let chunks = loader(4).split("tiny enormousword ok");
    assert_eq!(chunks, vec!["tiny", "enormousword", "ok"]);
  }

  #[tokio::test]
  async fn test_load_filters_extensions_and_recurses() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("a.txt"), "alpha text").await.unwrap();
    tokio::fs::write(dir.path().join("skip.bin"), "binary").await.unwrap();
    tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();
    tokio::fs::write(dir.path().join("nested/b.md"), "beta text").await.unwrap();

    let chunks = loader(1024).load(dir.path()).await.unwrap();

    let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a.txt#0", "nested/b.md#0"]);
    assert_eq!(chunks[1].text, "beta text");
  }

  #[tokio::test]
  async fn test_load_ids_distinguish_same_file_name() {
    let dir = tempfile::tempdir().unwrap();
    for sub in ["a", "b"] {
      tokio::fs::create_dir(dir.path().join(sub)).await.unwrap();
      tokio::fs::write(dir.path().join(sub).join("readme.txt"), sub).await.unwrap();
    }

    let chunks = loader(1024).load(dir.path()).await.unwrap();

    let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a/readme.txt#0", "b/readme.txt#0"]);
  }

  #[tokio::test]
  async fn test_load_empty_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = loader(1024).load(dir.path()).await.unwrap_err();
    assert!(matches!(err, ServiceError::EmptyCorpus { .. }));
  }

  #[tokio::test]
  async fn test_load_missing_directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = loader(1024)
      .load(&dir.path().join("missing"))
      .await
      .unwrap_err();
    assert!(matches!(err, ServiceError::Io { .. }));
  }
}
