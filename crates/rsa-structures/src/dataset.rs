// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
A subject's observation volume bundled with its label table.

Every operation that drops or reorders observations does so on the volume's
T axis and on the label rows together, so the two never drift apart.
*/

use crate::error::{RsaError, RsaResult};
use crate::labels::Labels;
use crate::result_volume::Affine;
use crate::volume::Volume;

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    volume: Volume,
    labels: Labels,
    affine: Option<Affine>,
}

impl Dataset {
    pub fn new(volume: Volume, labels: Labels) -> RsaResult<Self> {
        if volume.n_observations() != labels.len() {
            return Err(RsaError::LabelCountMismatch {
                observations: volume.n_observations(),
                labels: labels.len(),
            });
        }
        Ok(Self {
            volume,
            labels,
            affine: None,
        })
    }

    /// Attach the spatial transform of the source image. It is carried through
    /// to result volumes untouched.
    pub fn with_affine(mut self, affine: Affine) -> Self {
        self.affine = Some(affine);
        self
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn affine(&self) -> Option<&Affine> {
        self.affine.as_ref()
    }

    pub fn n_observations(&self) -> usize {
        self.labels.len()
    }

    pub fn into_parts(self) -> (Volume, Labels, Option<Affine>) {
        (self.volume, self.labels, self.affine)
    }

    /// Same labels and affine with a replacement volume of identical shape
    pub fn with_volume(&self, volume: Volume) -> RsaResult<Self> {
        let expected = self.volume.data().shape();
        let actual = volume.data().shape();
        if expected != actual {
            return Err(RsaError::ShapeMismatch {
                what: "replacement volume".into(),
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(Self {
            volume,
            labels: self.labels.clone(),
            affine: self.affine.clone(),
        })
    }

    /// Keep only the observations at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> RsaResult<Self> {
        if indices.is_empty() {
            return Err(RsaError::BadParameters(
                "selection leaves no observations".into(),
            ));
        }
        let volume = self.volume.select_observations(indices)?;
        Ok(Self {
            volume,
            labels: self.labels.select(indices),
            affine: self.affine.clone(),
        })
    }

    /// Drop every observation whose condition is listed in `excluded`
    pub fn exclude_conditions<S: AsRef<str>>(&self, excluded: &[S]) -> RsaResult<Self> {
        let keep: Vec<usize> = self
            .labels
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| !excluded.iter().any(|c| c.as_ref() == entry.condition))
            .map(|(i, _)| i)
            .collect();
        if keep.is_empty() {
            return Err(RsaError::BadParameters(format!(
                "excluding {} condition(s) removes all {} observations",
                excluded.len(),
                self.n_observations()
            )));
        }
        self.select(&keep)
    }

    /// Stable reorder of observations by condition name
    pub fn sort_by_condition(&self) -> RsaResult<Self> {
        let entries = self.labels.entries();
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| entries[a].condition.cmp(&entries[b].condition));
        self.select(&order)
    }
}
