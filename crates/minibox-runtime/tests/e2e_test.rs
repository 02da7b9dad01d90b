//! End-to-end tests for the minibox runtime.
//!
//! Covers the path from an image archive to a supervised child:
//! 1. Planning a run against the recording kernel
//! 2. Per-container writable layers
//! 3. Forking and waiting, with a kernel whose only real operation is `exec`
//! 4. Real containment as root (ignored by default)

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use minibox_common::config::RuntimeConfig;
use minibox_common::types::{ContainerId, ImageName};
use minibox_core::kernel::{Kernel, KernelOp, LinuxKernel, MountRequest};
use minibox_image::storage::ImageStore;
use minibox_runtime::contain;
use minibox_runtime::process::{CONTAINMENT_FAILURE_STATUS, Supervisor};

/// Held by every test that forks.
static FORK_LOCK: Mutex<()> = Mutex::new(());

fn write_image(images_dir: &Path, name: &str) {
    std::fs::create_dir_all(images_dir).unwrap();
    let file = std::fs::File::create(images_dir.join(format!("{name}.tar"))).unwrap();
    let mut builder = tar::Builder::new(file);
    for (path, data) in [("etc/hostname", &b"minibox\n"[..]), ("bin/true", &b""[..])] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }
    builder.finish().unwrap();
}

fn config_in(root: &Path) -> RuntimeConfig {
    write_image(&root.join("images"), "ubuntu");
    RuntimeConfig {
        images_dir: root.join("images"),
        containers_dir: root.join("containers"),
        ..RuntimeConfig::default()
    }
}

fn command(args: &[&str]) -> Vec<String> {
    args.iter().map(|&arg| arg.to_owned()).collect()
}

/// Accepts every isolation step without performing it and really execs.
struct ExecOnlyKernel;

impl Kernel for ExecOnlyKernel {
    fn unshare_mount_namespace(&self) -> io::Result<()> {
        Ok(())
    }

    fn mount(&self, _request: &MountRequest) -> io::Result<()> {
        Ok(())
    }

    fn unmount_detach(&self, _target: &Path) -> io::Result<()> {
        Ok(())
    }

    fn mknod_char(&self, _path: &Path, _mode: u32, _major: u64, _minor: u64) -> io::Result<()> {
        Ok(())
    }

    fn symlink(&self, _original: &Path, _link: &Path) -> io::Result<()> {
        Ok(())
    }

    fn pivot_root(&self, _new_root: &Path, _put_old: &Path) -> io::Result<()> {
        Ok(())
    }

    fn chdir(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn remove_dir(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn exec(&self, command: &[String]) -> io::Result<Infallible> {
        LinuxKernel::new().exec(command)
    }
}

// ── Planning ─────────────────────────────────────────────────────────

#[test]
fn plan_mounts_base_filesystems_inside_the_merged_root() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let merged = dir.path().join("containers/overlay/plan/merged");

    let ops = contain::dry_run(&config, &ContainerId::new("plan"), &command(&["/bin/sh"])).unwrap();

    let mounts: Vec<(Option<&str>, &Path)> = ops
        .iter()
        .filter_map(|op| match op {
            KernelOp::Mount(request) => Some((request.fstype.as_deref(), request.target.as_path())),
            _ => None,
        })
        .collect();
    assert_eq!(
        mounts,
        vec![
            (None, Path::new("/")),
            (Some("overlay"), merged.as_path()),
            (Some("proc"), merged.join("proc").as_path()),
            (Some("sysfs"), merged.join("sys").as_path()),
            (Some("tmpfs"), merged.join("dev").as_path()),
            (Some("devpts"), merged.join("dev/pts").as_path()),
        ]
    );
    assert_eq!(
        ops.last(),
        Some(&KernelOp::Exec {
            command: command(&["/bin/sh"])
        })
    );
}

#[test]
fn plan_extracts_the_image_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let _ = contain::dry_run(&config, &ContainerId::new("a"), &command(&["/bin/true"])).unwrap();
    let rootfs = ImageStore::open(&config.images_dir).rootfs_path(&ImageName::default());
    std::fs::write(rootfs.join("marker"), b"kept").unwrap();
    let _ = contain::dry_run(&config, &ContainerId::new("b"), &command(&["/bin/true"])).unwrap();

    assert!(rootfs.join("marker").exists());
    assert!(rootfs.join("etc/hostname").is_file());
}

// ── Writable layers ──────────────────────────────────────────────────

#[test]
fn each_container_gets_its_own_layer_directories() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    for id in ["first", "second"] {
        let _ = contain::dry_run(&config, &ContainerId::new(id), &command(&["/bin/true"])).unwrap();
    }

    let overlay = dir.path().join("containers/overlay");
    for id in ["first", "second"] {
        for layer in ["upper", "work", "merged"] {
            assert!(overlay.join(id).join(layer).is_dir(), "{id}/{layer}");
        }
    }
}

// ── Supervision ──────────────────────────────────────────────────────

#[test]
fn successful_program_reports_zero_status() {
    let _guard = FORK_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Supervisor::new(ExecOnlyKernel, config_in(dir.path()))
        .with_id_generator(|| ContainerId::new("ok"));
    let mut spawned = None;

    let report = supervisor
        .run(&command(&["true"]), |pid, id| spawned = Some((pid, id.clone())))
        .unwrap();

    assert_eq!(report.raw_status, 0);
    assert_eq!(report.exit_code(), Some(0));
    assert_eq!(spawned, Some((report.pid, ContainerId::new("ok"))));
    assert!(report.pid > 0);
}

#[test]
fn program_exit_code_is_passed_through() {
    let _guard = FORK_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Supervisor::new(ExecOnlyKernel, config_in(dir.path()));

    let report = supervisor
        .run(&command(&["sh", "-c", "exit 7"]), |_, _| {})
        .unwrap();

    assert_eq!(report.exit_code(), Some(7));
}

#[test]
fn signal_death_is_decoded() {
    let _guard = FORK_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Supervisor::new(ExecOnlyKernel, config_in(dir.path()));

    let report = supervisor
        .run(&command(&["sh", "-c", "kill -9 $$"]), |_, _| {})
        .unwrap();

    assert_eq!(report.exit_code(), None);
    assert_eq!(report.signal(), Some(libc::SIGKILL));
}

#[test]
fn unknown_program_exits_with_containment_failure() {
    let _guard = FORK_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Supervisor::new(ExecOnlyKernel, config_in(dir.path()));

    let report = supervisor
        .run(&command(&["/no/such/binary"]), |_, _| {})
        .unwrap();

    assert_eq!(report.exit_code(), Some(CONTAINMENT_FAILURE_STATUS));
}

#[test]
fn missing_image_exits_with_containment_failure() {
    let _guard = FORK_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig {
        image_name: ImageName::parse("ghost").unwrap(),
        ..config_in(dir.path())
    };
    let supervisor = Supervisor::new(ExecOnlyKernel, config);

    let report = supervisor.run(&command(&["true"]), |_, _| {}).unwrap();

    assert_eq!(report.exit_code(), Some(CONTAINMENT_FAILURE_STATUS));
    assert!(!dir.path().join("containers/overlay").exists());
}

// ── Real containment (root only) ─────────────────────────────────────

fn root_config() -> (tempfile::TempDir, RuntimeConfig) {
    let images_dir = std::env::var_os("MINIBOX_TEST_IMAGES_DIR")
        .map(PathBuf::from)
        .expect("MINIBOX_TEST_IMAGES_DIR must point at a directory holding ubuntu.tar");
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig {
        images_dir,
        containers_dir: dir.path().to_path_buf(),
        ..RuntimeConfig::default()
    };
    (dir, config)
}

#[test]
#[ignore = "requires root and a base image archive"]
fn real_container_runs_true() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (_dir, config) = root_config();
    let supervisor = Supervisor::new(LinuxKernel::new(), config);

    let report = supervisor.run(&command(&["true"]), |_, _| {}).unwrap();

    assert_eq!(report.raw_status, 0);
}

#[test]
#[ignore = "requires root and a base image archive"]
fn real_container_cannot_see_old_root() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (_dir, config) = root_config();
    let supervisor = Supervisor::new(LinuxKernel::new(), config);

    let report = supervisor
        .run(&command(&["sh", "-c", "test ! -e /old_root && test -c /dev/null"]), |_, _| {})
        .unwrap();

    assert_eq!(report.exit_code(), Some(0));
}

#[test]
#[ignore = "requires root and a base image archive"]
fn real_container_mounts_stay_out_of_host() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (dir, config) = root_config();
    let supervisor = Supervisor::new(LinuxKernel::new(), config)
        .with_id_generator(|| ContainerId::new("isolated"));

    let report = supervisor
        .run(&command(&["sh", "-c", "touch /inside"]), |_, _| {})
        .unwrap();
    assert_eq!(report.exit_code(), Some(0));

    let host_mounts = std::fs::read_to_string("/proc/self/mounts").unwrap();
    assert!(!host_mounts.contains(&dir.path().display().to_string()));
    assert!(dir.path().join("overlay/isolated/upper/inside").exists());
    assert!(!dir.path().join("overlay/isolated/merged/inside").exists());
}
