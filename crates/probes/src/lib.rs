#![forbid(unsafe_code)]

//! Fact sources backed by the host and the control plane: the image
//! directory itself, `qemu-img`, `virsh` and the control-plane database.

mod command;
pub mod control_plane;
mod error;
pub mod fs;
pub mod pool;
pub mod qemu_img;
pub mod virsh;

pub use control_plane::ControlPlaneDb;
pub use error::Error;
pub use fs::ReadDirLister;
pub use qemu_img::QemuImgInspector;
pub use virsh::VirshDomainMapper;

/// Name of the machine we run on, used to pick the storage pool.
pub fn host_name() -> Option<String> {
    sysinfo::System::host_name().filter(|name| !name.is_empty())
}
