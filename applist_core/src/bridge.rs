/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::bridge
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Dispatch method calls from the UI layer onto the inventory
    builder and platform actions, replying asynchronously.

  Security / Safety Notes:
    Caller-supplied package names are validated before any
    platform command is issued.

  Dependencies:
    tokio for the blocking pool and stdio transport,
    serde_json for call and reply envelopes.

  Operational Scope:
    Embedded by hosts that own the UI boundary, or driven over
    stdio by the `serve` subcommand.

  Revision History:
    2026-10-19 COD  Authored method-call dispatcher.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Blocking work never runs on the async reactor
    - Missing arguments yield structured errors, not panics
============================================================*/

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{AppListError, Result};
use crate::inventory::{build_inventory, Inventory, InventoryOptions};
use crate::logger::Logger;
use crate::registry::{LaunchOutcome, PackageRegistry, PlatformActions};

/// Name of the method channel shared with the UI layer.
pub const CHANNEL: &str = "com.example.app_list_flutter/apps";

pub const METHOD_LIST: &str = "getInstalledApps";
pub const METHOD_LAUNCH: &str = "openApp";
pub const METHOD_UNINSTALL: &str = "uninstallApp";

/// Code carried by argument errors.
pub const ERROR_CODE: &str = "ERROR";
pub const MISSING_PACKAGE_MESSAGE: &str = "Package name is null";
const PACKAGE_ARGUMENT: &str = "packageName";

/// An inbound call from the UI layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_argument(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }

    fn package_name(&self) -> Option<&str> {
        self.arguments.get(PACKAGE_ARGUMENT).and_then(Value::as_str)
    }
}

/// Reply sent back across the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Success {
        result: Value,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    NotImplemented,
}

impl Reply {
    fn error(code: &str, message: impl Into<String>) -> Self {
        Reply::Error {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Routes method calls to the inventory builder and platform actions.
pub struct Dispatcher {
    registry: Arc<dyn PackageRegistry>,
    actions: Arc<dyn PlatformActions>,
    options: InventoryOptions,
    logger: Arc<Logger>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn PackageRegistry>,
        actions: Arc<dyn PlatformActions>,
        options: InventoryOptions,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            registry,
            actions,
            options,
            logger,
        }
    }

    /// Handle one call. Never fails; every outcome is a `Reply`.
    pub async fn handle(&self, call: MethodCall) -> Reply {
        self.logger.debug("CALL", format!("{CHANNEL} {}", call.method));
        match call.method.as_str() {
            METHOD_LIST => match self.installed_apps().await {
                Ok(inventory) => match serde_json::to_value(&inventory.records) {
                    Ok(result) => Reply::Success { result },
                    Err(err) => Reply::error("SERIALIZATION_ERROR", err.to_string()),
                },
                Err(err) => {
                    self.logger.error("INVENTORY", err.to_string());
                    Reply::error("INVENTORY_ERROR", err.to_string())
                }
            },
            METHOD_LAUNCH => {
                let Some(package) = call.package_name() else {
                    return Reply::error(ERROR_CODE, MISSING_PACKAGE_MESSAGE);
                };
                match self.launch(package.to_string()).await {
                    Ok(outcome) => Reply::Success {
                        result: Value::Bool(outcome == LaunchOutcome::Started),
                    },
                    Err(err) => self.action_error(METHOD_LAUNCH, err),
                }
            }
            METHOD_UNINSTALL => {
                let Some(package) = call.package_name() else {
                    return Reply::error(ERROR_CODE, MISSING_PACKAGE_MESSAGE);
                };
                match self.uninstall(package.to_string()).await {
                    Ok(()) => Reply::Success {
                        result: Value::Bool(true),
                    },
                    Err(err) => self.action_error(METHOD_UNINSTALL, err),
                }
            }
            _ => Reply::NotImplemented,
        }
    }

    /// Run an inventory build on the blocking pool.
    pub async fn installed_apps(&self) -> Result<Inventory> {
        let registry = Arc::clone(&self.registry);
        let logger = Arc::clone(&self.logger);
        let options = self.options;
        tokio::task::spawn_blocking(move || build_inventory(registry.as_ref(), &options, &logger))
            .await
            .map_err(|err| AppListError::Runtime(format!("Inventory worker failed: {err}")))?
    }

    /// Launch `package` on the blocking pool.
    pub async fn launch(&self, package: String) -> Result<LaunchOutcome> {
        let actions = Arc::clone(&self.actions);
        let outcome = tokio::task::spawn_blocking(move || actions.launch(&package))
            .await
            .map_err(|err| AppListError::Runtime(format!("Launch worker failed: {err}")))??;
        if outcome == LaunchOutcome::NoLaunchEntry {
            self.logger.info("LAUNCH", "Package has no launcher entry point");
        }
        Ok(outcome)
    }

    /// Request the uninstall flow for `package` on the blocking pool.
    pub async fn uninstall(&self, package: String) -> Result<()> {
        let actions = Arc::clone(&self.actions);
        tokio::task::spawn_blocking(move || actions.uninstall(&package))
            .await
            .map_err(|err| AppListError::Runtime(format!("Uninstall worker failed: {err}")))?
    }

    fn action_error(&self, method: &str, err: AppListError) -> Reply {
        self.logger.warn("ACTION", format!("{method}: {err}"));
        match err {
            AppListError::InvalidArgument(message) => Reply::error(ERROR_CODE, message),
            other => Reply::error("PLATFORM_ERROR", other.to_string()),
        }
    }
}

/// Newline-delimited request on the stdio transport.
#[derive(Debug, Deserialize)]
struct CallEnvelope {
    #[serde(default)]
    id: Value,
    #[serde(flatten)]
    call: MethodCall,
}

#[derive(Debug, Serialize)]
struct ReplyEnvelope {
    id: Value,
    reply: Reply,
}

/// Serve newline-delimited JSON calls from `reader`, writing one reply
/// line per call to `writer`. Calls run concurrently; replies are written
/// as they complete and carry the caller's `id`.
pub async fn serve<R, W>(dispatcher: Arc<Dispatcher>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (sender, mut replies) = mpsc::unbounded_channel::<ReplyEnvelope>();
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<CallEnvelope>(&line) {
                    Ok(CallEnvelope { id, call }) => {
                        let dispatcher = Arc::clone(&dispatcher);
                        let sender = sender.clone();
                        tokio::spawn(async move {
                            let reply = dispatcher.handle(call).await;
                            // Receiver only closes once serve has returned.
                            let _ = sender.send(ReplyEnvelope { id, reply });
                        });
                    }
                    Err(err) => {
                        let reply = Reply::error("BAD_REQUEST", err.to_string());
                        write_reply(&mut writer, &ReplyEnvelope { id: Value::Null, reply }).await?;
                    }
                }
            }
            Some(envelope) = replies.recv() => {
                write_reply(&mut writer, &envelope).await?;
            }
        }
    }

    drop(sender);
    while let Some(envelope) = replies.recv().await {
        write_reply(&mut writer, &envelope).await?;
    }
    writer.flush().await?;
    Ok(())
}

async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, envelope: &ReplyEnvelope) -> Result<()> {
    let mut line = serde_json::to_vec(envelope)
        .map_err(|err| AppListError::Serialization(format!("Failed to encode reply: {err}")))?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
