// Copyright (c) 2024-2025 The dmk developers

//! Device management kit, high level SDK surface.
//!
//! [`Dmk`] bundles the pieces of [`dmk_core`] behind one object: transports
//! are registered on a [`DmkBuilder`], sessions are opened with
//! [`Dmk::connect`] and addressed by [`SessionId`][dmk_core::session::SessionId]
//! afterwards. Commands and device actions are forwarded to the matching
//! session, and sessions whose device drops off the link are retired
//! automatically.
//!
//! ```no_run
//! use dmk::prelude::*;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let dmk = DmkBuilder::new().with_transport(TcpTransport).build();
//!
//! let id = dmk.connect("tcp", "127.0.0.1:1237").await?;
//! let info = dmk.send_command(&id, &GetAppAndVersionCommand).await?;
//! println!("running {} {}", info.name, info.version);
//!
//! dmk.disconnect(&id)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod prelude;
mod sdk;
pub mod transport;

pub use sdk::{Dmk, DmkBuilder};

/// Re-export `dmk-apdu` for consumers
pub use dmk_apdu as apdu;
