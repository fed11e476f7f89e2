// tangent/renderer/src/lib.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Translates portable GL ES state and draw calls into the minimal sequence of native device
//! calls.
//!
//! The `Renderer` owns the device, the pipeline state cache, and the shadow of everything it
//! has bound. Logical objects (textures, renderbuffers, buffers, the swap chain) live in a
//! `ResourceManager` owned by the caller and are resolved to native views on every apply.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

pub mod buffer;
pub mod error;
pub mod formats;
pub mod framebuffer;
pub mod gl;
pub mod index_data;
pub mod options;
pub mod perf;
pub mod program;
pub mod render_target;
pub mod renderbuffer;
pub mod renderer;
pub mod resources;
pub mod state_cache;
pub mod streaming_buffer;
pub mod swap_chain;
pub mod texture;
pub mod texture_storage;
pub mod translate;
pub mod vertex_data;

pub use crate::error::{Error, InitErrorKind, RendererError, Result};
pub use crate::renderer::{Renderer, RendererCore};
pub use crate::resources::ResourceManager;
