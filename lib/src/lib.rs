// BEGIN - Embark standard lints v0.4
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_on_vec_items,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::mismatched_target_os,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v0.4

//! `stylize-datasets` applies arbitrary style transfer to every image of a
//! dataset, producing stylized variants while keeping the dataset's shape.
//!
//! Stylization uses adaptive instance normalization: content and style images
//! are encoded by a pretrained VGG encoder, the per channel statistics of the
//! content features are replaced by those of the style features, and a
//! pretrained decoder turns the result back into an image.
//!
//! There are two ways to run a whole dataset:
//!
//! 1. [`DirectoryStylizer`] writes `{content}-stylized-{style}` files for
//!    `num_styles` randomly sampled styles per content image, mirroring the
//!    content directory layout under an output directory.
//! 2. [`DatasetStylizer`] copies an annotated dataset and then overwrites
//!    every image of the copy with its stylization, so file names, class
//!    directories and annotations all stay valid.
//!
//! Both draw styles from a seedable random source, the same seed over the
//! same files always gives the same output.
//!
//! ## Usage
//!
//! ```no_run
//! use stylize_datasets as sd;
//!
//! let config = sd::DirectoryConfig {
//!     content_root: "imgs/content".into(),
//!     style_root: "imgs/styles".into(),
//!     output_root: "out".into(),
//!     num_styles: 2,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//!
//! // Load the pretrained networks once
//! let engine = sd::StyleTransfer::builder()
//!     .config(&config.transfer)
//!     .build()
//!     .expect("failed to load networks");
//!
//! let report = sd::DirectoryStylizer::new(&config)
//!     .and_then(|job| job.run(&engine, None))
//!     .expect("invalid configuration");
//! println!("stylized {} images", report.stylized);
//! ```
pub mod adain;
pub mod batch;
pub mod config;
pub mod dataset;
mod errors;
pub mod net;
pub mod pairing;
mod transfer;
mod utils;
pub mod walker;

pub use candle_core;
pub use image;

pub use batch::{BatchProgress, DatasetStylizer, DirectoryStylizer, ProgressUpdate, RunReport};
pub use config::{ConfigFormat, ConfigLoader, DatasetConfig, DirectoryConfig, TransferConfig};
pub use errors::{Error, InvalidRange};
pub use net::{FeatureNetwork, VggAutoencoder};
pub use transfer::{StyleTransfer, StyleTransferBuilder};
pub use utils::{load_rgb_image, save_rgb_image};
