//! 外部 overlay 进程（ueberzug 的 simple parser）：图片画在终端窗口之上，
//! 命令走子进程 stdin，图片经临时文件传递。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use image::DynamicImage;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{ArtError, Result};
use crate::geometry::{CellAnchor, Placement};
use crate::model::{CacheKey, CacheValue};

pub const IDENTIFIER: &str = "sleeve-artwork";

/// `add` 命令行（不含换行）
pub fn add_command(identifier: &str, anchor: &CellAnchor, path: &str, scaler: &str) -> String {
    format!(
        "action\tadd\tidentifier\t{identifier}\tx\t{}\ty\t{}\tmax_width\t{}\tmax_height\t{}\tpath\t{path}\tscaler\t{scaler}",
        anchor.col, anchor.row, anchor.cols, anchor.rows
    )
}

pub fn remove_command(identifier: &str) -> String {
    format!("action\tremove\tidentifier\t{identifier}")
}

struct Shown {
    key: CacheKey,
    path: PathBuf,
}

pub struct OverlayBackend {
    child: Option<Child>,
    stdin: Box<dyn Write + Send>,
    dir: TempDir,
    scaler: String,
    shown: Option<Shown>,
    next_file: u64,
}

impl OverlayBackend {
    /// 启动 overlay 进程；失败返回 `BackendUnavailable`
    pub fn spawn(command: &[String], scaler: &str) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ArtError::BackendUnavailable("empty overlay command".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ArtError::BackendUnavailable(format!("failed to start {program}: {e}")))?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ArtError::BackendUnavailable(format!("{program} has no stdin pipe")));
        };
        debug!("overlay process {program} started (pid {})", child.id());

        let mut backend = Self::with_writer(Box::new(stdin), scaler)?;
        backend.child = Some(child);
        Ok(backend)
    }

    /// 命令写入任意 writer，不管理子进程（overlay 由调用方启动时使用）
    pub fn with_writer(stdin: Box<dyn Write + Send>, scaler: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("sleeve-art-").tempdir()?;
        Ok(Self {
            child: None,
            stdin,
            dir,
            scaler: scaler.to_string(),
            shown: None,
            next_file: 0,
        })
    }

    pub fn encode(&self, image: &DynamicImage, placement: &Placement) -> Result<Vec<u8>> {
        super::scaled_png(image, placement)
    }

    /// 写临时文件并发送 `add`；像素相同时沿用已有文件
    pub fn show(&mut self, key: &CacheKey, value: &CacheValue, anchor: &CellAnchor) -> Result<()> {
        let reuse = self.shown.as_ref().filter(|s| s.key.same_pixels(key)).map(|s| s.path.clone());
        let fresh = reuse.is_none();
        let path = match reuse {
            Some(path) => path,
            None => {
                self.next_file += 1;
                let path = self.dir.path().join(format!("art-{}.png", self.next_file));
                fs::write(&path, &value.payload)?;
                path
            }
        };

        let line = add_command(IDENTIFIER, anchor, &path.to_string_lossy(), &self.scaler);
        if let Err(e) = self.send(&line) {
            if fresh {
                discard(&path);
            }
            return Err(e);
        }

        if let Some(old) = self.shown.replace(Shown { key: key.clone(), path: path.clone() }) {
            if old.path != path {
                discard(&old.path);
            }
        }
        Ok(())
    }

    /// 像素相同时只重发 `add` 到新位置
    pub fn reposition(&mut self, key: &CacheKey, anchor: &CellAnchor) -> Result<bool> {
        let line = match self.shown.as_mut() {
            Some(shown) if shown.key.same_pixels(key) => {
                shown.key = key.clone();
                add_command(IDENTIFIER, anchor, &shown.path.to_string_lossy(), &self.scaler)
            }
            _ => return Ok(false),
        };
        self.send(&line)?;
        Ok(true)
    }

    pub fn remove(&mut self) -> Result<()> {
        self.send(&remove_command(IDENTIFIER))?;
        if let Some(old) = self.shown.take() {
            discard(&old.path);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        if let Some(old) = self.shown.take() {
            discard(&old.path);
        }
    }

    fn send(&mut self, line: &str) -> Result<()> {
        let result = writeln!(self.stdin, "{line}").and_then(|_| self.stdin.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                Err(ArtError::BackendUnavailable("overlay process exited".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("failed to remove {}: {e}", path.display());
    }
}

impl Drop for OverlayBackend {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("failed to stop overlay process: {e}");
            }
            let _ = child.wait();
        }
        // TempDir 随后析构，删除目录及剩余文件
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(String::from)
                .collect()
        }
    }

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn anchor(col: u16) -> CellAnchor {
        CellAnchor { col, row: 2, pixel_x: 0, pixel_y: 0, cols: 10, rows: 5 }
    }

    fn key(uri: &str, x: u16) -> CacheKey {
        CacheKey { uri: uri.into(), width: 80, height: 80, panel_x: x, panel_y: 0 }
    }

    fn value() -> CacheValue {
        CacheValue { payload: Arc::from(b"png".to_vec()), x_offset: 0, y_offset: 0 }
    }

    #[test]
    fn command_lines_are_tab_separated() {
        assert_eq!(
            add_command("id", &anchor(4), "/tmp/a.png", "fit_contain"),
            "action\tadd\tidentifier\tid\tx\t4\ty\t2\tmax_width\t10\tmax_height\t5\tpath\t/tmp/a.png\tscaler\tfit_contain"
        );
        assert_eq!(remove_command("id"), "action\tremove\tidentifier\tid");
    }

    #[test]
    fn show_writes_file_and_replaces_previous_one() {
        let capture = Capture::default();
        let mut backend = OverlayBackend::with_writer(Box::new(capture.clone()), "contain").unwrap();

        backend.show(&key("a", 0), &value(), &anchor(0)).unwrap();
        let first = backend.shown.as_ref().unwrap().path.clone();
        assert_eq!(fs::read(&first).unwrap(), b"png");

        backend.show(&key("b", 0), &value(), &anchor(0)).unwrap();
        let second = backend.shown.as_ref().unwrap().path.clone();
        assert!(!first.exists());
        assert!(second.exists());
        assert_eq!(capture.lines().len(), 2);
    }

    #[test]
    fn reposition_reuses_file_for_same_pixels() {
        let capture = Capture::default();
        let mut backend = OverlayBackend::with_writer(Box::new(capture.clone()), "contain").unwrap();
        assert!(!backend.reposition(&key("a", 0), &anchor(0)).unwrap());

        backend.show(&key("a", 0), &value(), &anchor(0)).unwrap();
        assert!(backend.reposition(&key("a", 7), &anchor(7)).unwrap());
        let lines = capture.lines();
        assert!(lines[1].contains("\tx\t7\t"));
        assert!(!backend.reposition(&key("b", 7), &anchor(7)).unwrap());
    }

    #[test]
    fn remove_sends_command_and_deletes_file() {
        let capture = Capture::default();
        let mut backend = OverlayBackend::with_writer(Box::new(capture.clone()), "contain").unwrap();
        backend.show(&key("a", 0), &value(), &anchor(0)).unwrap();
        let path = backend.shown.as_ref().unwrap().path.clone();

        backend.remove().unwrap();
        assert!(!path.exists());
        assert_eq!(capture.lines()[1], remove_command(IDENTIFIER));
    }

    #[test]
    fn temp_dir_is_removed_on_drop() {
        let backend = OverlayBackend::with_writer(Box::new(Capture::default()), "contain").unwrap();
        let dir = backend.dir.path().to_path_buf();
        assert!(dir.exists());
        drop(backend);
        assert!(!dir.exists());
    }

    #[test]
    fn broken_pipe_disables_backend() {
        let mut backend = OverlayBackend::with_writer(Box::new(Closed), "contain").unwrap();
        let err = backend.remove().unwrap_err();
        assert!(matches!(err, ArtError::BackendUnavailable(_)));

        // 没发出去的图片文件不留在临时目录里
        let err = backend.show(&key("a", 0), &value(), &anchor(0)).unwrap_err();
        assert!(matches!(err, ArtError::BackendUnavailable(_)));
        assert!(backend.shown.is_none());
        assert_eq!(fs::read_dir(backend.dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_program_is_backend_unavailable() {
        let command = vec!["sleeve-no-such-overlay-binary".to_string()];
        assert!(matches!(
            OverlayBackend::spawn(&command, "contain"),
            Err(ArtError::BackendUnavailable(_))
        ));
        assert!(matches!(OverlayBackend::spawn(&[], "contain"), Err(ArtError::BackendUnavailable(_))));
    }
}
