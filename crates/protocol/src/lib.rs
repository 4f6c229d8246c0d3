//! Codec for the text a Tcl interpreter prints back.
//!
//! This crate holds the pure, I/O-free half of the bridge: everything that
//! turns loosely structured interpreter output into typed values, and the
//! reverse direction of quoting Rust values into Tcl words.
//!
//! - [`value`]: scalar coercion of a single token into a [`DecodedValue`]
//! - [`attributes`]: `-name value` blobs into an [`AttributeMap`]
//! - [`keyed`]: the nested [`KeyedResult`] tree built by keyed-list decoding
//! - [`list`]: Tcl list splitting and word quoting
//! - [`options`]: ordered `-name value` argument rendering
//! - [`text`]: line normalization helpers
//!
//! Keyed-list decoding itself needs a live interpreter and lives in the
//! `tclbridge` crate; only its result types are defined here.

pub mod attributes;
pub mod keyed;
pub mod list;
pub mod options;
pub mod text;
pub mod value;

pub use attributes::{AttributeMap, DecodeAmbiguity, decode_attributes, decode_attributes_detailed};
pub use keyed::{KeyedNode, KeyedResult};
pub use list::{ListError, ListItem, flatten_words, join_list, quote_word, render_nested, split_list};
pub use options::{ArgValue, CommandArgs};
pub use text::{compact_lines, normalize_output};
pub use value::{DecodedValue, TIMESTAMP_FORMAT, coerce};
