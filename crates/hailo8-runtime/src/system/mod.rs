//! Host and hardware probing.

mod hardware;
mod host;
mod probe;

pub use hardware::{
    PYTHON_IMPORT_CHECK, module_loaded, pcie_device_visible, present_device_nodes,
    probe_hardware, python_binding_importable,
};
pub use host::{free_disk_gb, is_root};
pub use probe::{command_exists, detect_package_manager, detect_system_info, parse_os_release};
