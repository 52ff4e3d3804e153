//! Shell-script stand-ins for ffmpeg and ffprobe.
//!
//! Each fake answers `-version` and `-encoders` like the real tools do, so
//! the batch preflight passes, and otherwise behaves as described on the
//! constructor.

use gpuconv::engine::Toolchain;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

const PREAMBLE: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    echo "ffmpeg version 6.1-fake Copyright (c) the gpuconv tests"
    exit 0
fi
if [ "$1" = "-hide_banner" ]; then
    echo " V....D libx264              libx264 H.264 (fake)"
    echo " A....D aac                  AAC (fake)"
    exit 0
fi
for last; do :; done
"#;

/// Write an executable script and wait until it can be executed
///
/// Another test thread forking while the script is still open for writing
/// makes exec fail with ETXTBSY for a moment.
fn write_script(path: &Path, body: &str) -> PathBuf {
    fs::write(path, body).expect("Failed to write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod script");

    for _ in 0..50 {
        match Command::new(path).arg("-version").output() {
            Ok(_) => break,
            Err(e) if e.raw_os_error() == Some(libc::ETXTBSY) => {
                thread::sleep(Duration::from_millis(20))
            }
            Err(e) => panic!("fake tool {} not runnable: {}", path.display(), e),
        }
    }
    path.to_path_buf()
}

/// ffmpeg that prints the given stats lines (`\r`-terminated, like the real
/// one) on stderr and creates the output file
pub fn ffmpeg_with_stats(dir: &Path, stats: &[&str]) -> PathBuf {
    let mut body = PREAMBLE.to_string();
    for line in stats {
        body.push_str(&format!("printf '%s\\r' '{}' >&2\n", line));
    }
    body.push_str(": > \"$last\"\nexit 0\n");
    write_script(&dir.join("ffmpeg"), &body)
}

/// ffmpeg that succeeds quietly unless the input is `bad.mp4`, in which
/// case it writes a partial output, complains and exits 1
pub fn ffmpeg_failing_on_bad(dir: &Path) -> PathBuf {
    let mut body = PREAMBLE.to_string();
    body.push_str(
        r#": > "$last"
case "$*" in
    */bad.mp4*)
        echo "bad.mp4: Invalid data found when processing input" >&2
        exit 1
        ;;
esac
printf '%s\r' 'frame=  50 fps=0.0 q=28.0 size=     256kB time=00:02:00.00 bitrate=N/A speed=99x' >&2
exit 0
"#,
    );
    write_script(&dir.join("ffmpeg"), &body)
}

/// ffmpeg that reports a little progress and then hangs until killed
pub fn ffmpeg_hanging(dir: &Path) -> PathBuf {
    let mut body = PREAMBLE.to_string();
    body.push_str(
        r#"printf '%s\r' 'frame=   1 fps=0.0 q=0.0 size=       0kB time=00:00:01.00 bitrate=N/A speed=1x' >&2
exec sleep 30
"#,
    );
    write_script(&dir.join("ffmpeg"), &body)
}

/// ffprobe that reports the same duration for every file
pub fn ffprobe_reporting(dir: &Path, duration: &str) -> PathBuf {
    let body = format!(
        "#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then echo \"ffprobe version 6.1-fake\"; exit 0; fi\necho \"{}\"\n",
        duration
    );
    write_script(&dir.join("ffprobe"), &body)
}

/// Toolchain built from a fake ffmpeg and an ffprobe reporting `duration`
pub fn toolchain(dir: &Path, ffmpeg: PathBuf, duration: &str) -> Toolchain {
    Toolchain {
        ffmpeg,
        ffprobe: ffprobe_reporting(dir, duration),
    }
}
