//! Network export to SPICE
//!
//! Convenience wrappers that feed a loaded Network through the subcircuit
//! synthesizer.

use std::path::Path;

use super::core::Network;
use crate::error::SynthesisError;
use crate::spice::{spice_comments, synthesize, Subcircuit, SynthesisOptions};

impl Network {
    /// Comments of the source file as `*` header lines
    pub fn header_comments(&self) -> Vec<String> {
        spice_comments(&self.comments)
    }

    /// Synthesize an equivalent SPICE subcircuit
    ///
    /// `name` overrides the network name; one of the two must be present.
    /// `comments` are emitted verbatim as header lines.
    pub fn to_subcircuit<'a>(
        &'a self,
        name: Option<&str>,
        comments: Option<&[String]>,
        options: &SynthesisOptions,
    ) -> Result<Subcircuit<'a>, SynthesisError> {
        let name = name
            .or(self.name.as_deref())
            .ok_or_else(|| SynthesisError::InvalidName(String::new()))?;

        synthesize(
            name,
            self.frequency.f(),
            self.s.view(),
            &self.reference_impedance(),
            comments,
            options,
        )
    }

    /// Synthesize and write a SPICE include file
    ///
    /// Nothing is written when synthesis fails. An existing file is only
    /// replaced when `overwrite` is set.
    pub fn write_spice<P: AsRef<Path>>(
        &self,
        path: P,
        comments: Option<&[String]>,
        options: &SynthesisOptions,
        overwrite: bool,
    ) -> Result<(), SynthesisError> {
        self.to_subcircuit(None, comments, options)?
            .write(path, overwrite)
    }
}
