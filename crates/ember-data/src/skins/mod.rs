// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The skin registry: deduplicated materials and textures combined into skins.

mod loader;
mod registry;
mod transparency;

pub use self::loader::decode_texture;
pub use self::registry::{SkinRegistry, TextureRecord};
pub use self::transparency::{apply_color_key, apply_transparency, AlphaSettings, ColorKey};
