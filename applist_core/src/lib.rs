/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Library surface of AppList-Core: installed-application
    inventory, storage footprint walker, icon normalisation and
    the method-call bridge to the UI layer.

  Security / Safety Notes:
    Read-only against package data; launch and uninstall are
    delegated to the platform's own user-facing flows.

  Dependencies:
    See individual modules.

  Operational Scope:
    Linked by the `applist-core` binary and by embedding hosts.

  Revision History:
    2026-10-19 COD  Established library layout.
  ------------------------------------------------------------
  SSE Principles Observed:
    - One module per concern
    - Platform access isolated behind registry traits
============================================================*/

pub mod apk;
pub mod bridge;
pub mod config;
pub mod error;
pub mod icon;
pub mod inventory;
pub mod logger;
pub mod package_info;
pub mod registry;
pub mod walker;

pub use error::{AppListError, Result};
pub use inventory::{build_inventory, Inventory, InventoryOptions};
pub use package_info::{PackageDescriptor, PackageFlags, PackageRecord};
pub use registry::{LaunchOutcome, PackageRegistry, PlatformActions, ShellRegistry};
pub use walker::directory_size;
