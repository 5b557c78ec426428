//! Stack frame extraction and selection.
//!
//! Frames come from the display form of `std::backtrace::Backtrace`:
//!
//! ```text
//!    3: app::views::checkout
//!              at ./src/views.rs:42:9
//! ```
//!
//! Paths under the current directory are printed relative (`./…`), others
//! absolute.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Path fragments marking dependency and standard-library code. Registry and
/// git checkouts keep these segments wherever `CARGO_HOME` points.
const LIBRARY_MARKERS: [&str; 3] = ["/registry/src/", "/git/checkouts/", "/rustc/"];

/// One resolved symbol of a backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// Parse backtrace text into frames, innermost first.
pub fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line_no) = split_location(location);
                frame.file = Some(file.to_string());
                frame.line = line_no;
            }
            continue;
        }
        let function = match line.split_once(": ") {
            Some((index, name)) if index.chars().all(|c| c.is_ascii_digit()) => name,
            _ => line,
        };
        frames.push(Frame {
            function: function.to_string(),
            file: None,
            line: None,
        });
    }
    frames
}

/// Split `path:line:col` (column optional) into path and line.
fn split_location(location: &str) -> (&str, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next().unwrap_or_default();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle) {
        (Some(path), Some(line)) if line.parse::<u32>().is_ok() && last.parse::<u32>().is_ok() => {
            (path, line.parse().ok())
        }
        (_, Some(_)) if last.parse::<u32>().is_ok() => {
            let cut = location.len() - last.len() - 1;
            (&location[..cut], last.parse().ok())
        }
        _ => (location, None),
    }
}

/// Resolve a printed path against the current directory.
pub fn resolve_path(file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let relative = path.strip_prefix(".").unwrap_or(path);
    match env::current_dir() {
        Ok(cwd) => cwd.join(relative),
        Err(_) => relative.to_path_buf(),
    }
}

/// True for dependency, standard-library and synchrolog's own library sources.
/// The binaries under `src/` count as application code.
pub fn is_library_path(file: &str) -> bool {
    if LIBRARY_MARKERS.iter().any(|marker| file.contains(marker)) {
        return true;
    }
    let resolved = resolve_path(file);
    let in_cargo_home = env::var_os("CARGO_HOME")
        .filter(|home| !home.is_empty())
        .is_some_and(|home| resolved.starts_with(home));
    if in_cargo_home {
        return true;
    }
    let own_sources = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    resolved.starts_with(&own_sources)
        && !resolved.starts_with(own_sources.join("bin"))
        && resolved != own_sources.join("main.rs")
}

/// The frame shown to the user: the innermost frame outside library code,
/// else the outermost frame with a known file.
pub fn select_frame(frames: &[Frame]) -> Option<&Frame> {
    let located = || frames.iter().filter(|frame| frame.file.is_some());
    located()
        .find(|frame| frame.file.as_deref().is_some_and(|file| !is_library_path(file)))
        .or_else(|| located().last())
}

/// Full source text of `file`, or an empty string when unreadable.
pub fn read_source(file: &str) -> String {
    fs::read_to_string(resolve_path(file)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/std/src/backtrace.rs:312:13
   1: synchrolog::record::ExceptionInfo::capture
             at ./src/record/mod.rs:77:25
   2: tracing_core::dispatcher::Dispatch::event
             at /home/dev/.cargo/registry/src/index.crates.io-6f17/tracing-core-0.1.32/src/dispatcher.rs:615:9
   3: shop::views::checkout::{{closure}}
             at ./app/views.rs:42:9
      shop::views::checkout
             at ./app/views.rs:40:5
   4: tokio::runtime::task::core::Core<T,S>::poll
             at /home/dev/.cargo/registry/src/index.crates.io-6f17/tokio-1.38.0/src/runtime/task/core.rs:328:17
   5: __libc_start_main
   6: _start
";

    #[test]
    fn test_parse_frames_and_inline_symbols() {
        let frames = parse_backtrace(SAMPLE);
        assert_eq!(frames.len(), 8);
        assert_eq!(frames[3].function, "shop::views::checkout::{{closure}}");
        assert_eq!(frames[3].file.as_deref(), Some("./app/views.rs"));
        assert_eq!(frames[3].line, Some(42));
        assert_eq!(frames[4].function, "shop::views::checkout");
        assert_eq!(frames[4].line, Some(40));
        assert!(frames[6].file.is_none());
    }

    #[test]
    fn test_select_innermost_application_frame() {
        let frames = parse_backtrace(SAMPLE);
        let frame = select_frame(&frames).unwrap();
        assert_eq!(frame.file.as_deref(), Some("./app/views.rs"));
        assert_eq!(frame.line, Some(42));
    }

    #[test]
    fn test_dependencies_outside_home_cargo_are_library() {
        let frames = parse_backtrace(
            "   0: tracing_subscriber::layer::layered::Layered<L,S>::event
             at /usr/local/cargo/registry/src/index.crates.io-6f17/tracing-subscriber-0.3.18/src/layer/layered.rs:153:9
   1: tracing_core::dispatcher::Dispatch::event
             at /usr/local/cargo/registry/src/index.crates.io-6f17/tracing-core-0.1.32/src/dispatcher.rs:615:9
   2: shared::git_dep::call
             at /opt/cargo/git/checkouts/shared-3f2a/1c9e0b7/src/lib.rs:7:5
   3: app::views::checkout
             at /srv/shop/src/views.rs:42:9
",
        );
        let frame = select_frame(&frames).unwrap();
        assert_eq!(frame.file.as_deref(), Some("/srv/shop/src/views.rs"));
        assert_eq!(frame.line, Some(42));
    }

    #[test]
    fn test_all_library_falls_back_to_outermost() {
        let frames = parse_backtrace(
            "   0: tokio::spawn
             at /home/dev/.cargo/registry/src/x/tokio/src/lib.rs:10:1
   1: std::rt::lang_start
             at /rustc/abc/library/std/src/rt.rs:20:2
   2: _start
",
        );
        let frame = select_frame(&frames).unwrap();
        assert_eq!(frame.file.as_deref(), Some("/rustc/abc/library/std/src/rt.rs"));
        assert_eq!(frame.line, Some(20));
    }

    #[test]
    fn test_no_locations() {
        let frames = parse_backtrace("   0: <unknown>\n   1: <unknown>\n");
        assert!(select_frame(&frames).is_none());
    }

    #[test]
    fn test_split_location_variants() {
        assert_eq!(split_location("./a.rs:12:5"), ("./a.rs", Some(12)));
        assert_eq!(split_location("./a.rs:12"), ("./a.rs", Some(12)));
        assert_eq!(split_location("C:\\src\\a.rs:3:1"), ("C:\\src\\a.rs", Some(3)));
        assert_eq!(split_location("./a.rs"), ("./a.rs", None));
    }

    #[test]
    fn test_own_sources_are_library() {
        let own = concat!(env!("CARGO_MANIFEST_DIR"), "/src/record/mod.rs");
        assert!(is_library_path(own));
        let tests = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/request_flow.rs");
        assert!(!is_library_path(tests));
        let demo = concat!(env!("CARGO_MANIFEST_DIR"), "/src/main.rs");
        assert!(!is_library_path(demo));
        let probe = concat!(env!("CARGO_MANIFEST_DIR"), "/src/bin/synchrolog-probe.rs");
        assert!(!is_library_path(probe));
    }

    #[test]
    fn test_read_source() {
        let own = concat!(env!("CARGO_MANIFEST_DIR"), "/src/events/traceback.rs");
        assert!(read_source(own).contains("fn read_source"));
        assert_eq!(read_source("/nonexistent/file.rs"), "");
    }
}
