//! Which styles get applied to which content image, and where the result
//! is written.

use crate::Error;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// The random source behind every style draw of a run.
///
/// Two samplers created with the same seed make the same draws, in the
/// same order.
pub struct StyleSampler {
    rng: Pcg32,
    seed: u64,
}

impl StyleSampler {
    /// Creates a sampler from `seed`, or from a freshly drawn seed if none is
    /// given. The seed in use is available from `seed()` so the run can be
    /// repeated.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            rng: Pcg32::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws `amount` distinct indices out of `0..len`, without replacement.
    pub fn sample_distinct(&mut self, len: usize, amount: usize) -> Result<Vec<usize>, Error> {
        if amount == 0 {
            return Err(Error::out_of_range("num-styles", 0.0, 1.0, f32::INFINITY));
        }
        if amount > len {
            return Err(Error::TooManyStyles {
                requested: amount,
                available: len,
            });
        }

        Ok(rand::seq::index::sample(&mut self.rng, len, amount).into_vec())
    }

    /// Draws a single index out of `0..len`, with replacement.
    pub fn draw(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Draws an index out of `0..len` that isn't in `excluded`, or `None` if
    /// every index is excluded.
    pub fn draw_excluding(&mut self, len: usize, excluded: &[usize]) -> Option<usize> {
        let candidates: Vec<usize> = (0..len).filter(|i| !excluded.contains(i)).collect();
        candidates.choose(&mut self.rng).copied()
    }
}

/// One content image and the style images chosen for it, in the order they
/// will be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pairing {
    pub content: PathBuf,
    pub styles: Vec<PathBuf>,
}

/// The pairings of a whole run, in content order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairingPlan {
    pairings: Vec<Pairing>,
}

impl PairingPlan {
    /// Pairs each content image with `num_styles` distinct styles, sampled
    /// uniformly without replacement.
    pub fn distinct_styles(
        contents: &[PathBuf],
        styles: &[PathBuf],
        num_styles: usize,
        sampler: &mut StyleSampler,
    ) -> Result<Self, Error> {
        let pairings = contents
            .iter()
            .map(|content| {
                let picked = sampler.sample_distinct(styles.len(), num_styles)?;
                Ok(Pairing {
                    content: content.clone(),
                    styles: picked.into_iter().map(|i| styles[i].clone()).collect(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { pairings })
    }

    /// Pairs each content image with a single style, every draw independent
    /// of the others.
    pub fn single_style(
        contents: &[PathBuf],
        styles: &[PathBuf],
        sampler: &mut StyleSampler,
    ) -> Result<Self, Error> {
        if styles.is_empty() {
            return Err(Error::TooManyStyles {
                requested: 1,
                available: 0,
            });
        }

        let pairings = contents
            .iter()
            .map(|content| Pairing {
                content: content.clone(),
                styles: vec![styles[sampler.draw(styles.len())].clone()],
            })
            .collect();

        Ok(Self { pairings })
    }

    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pairing> {
        self.pairings.iter()
    }
}

impl IntoIterator for PairingPlan {
    type Item = Pairing;
    type IntoIter = std::vec::IntoIter<Pairing>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairings.into_iter()
    }
}

/// `{content stem}-stylized-{style stem}{content extension}`
pub fn stylized_file_name(content: &Path, style: &Path) -> OsString {
    let mut name = OsString::new();
    if let Some(stem) = content.file_stem() {
        name.push(stem);
    }
    name.push("-stylized-");
    if let Some(stem) = style.file_stem() {
        name.push(stem);
    }
    if let Some(ext) = content.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Where the stylization of `content` with `style` is written: the same
/// directory relative to `output_root` as `content` has relative to
/// `content_root`.
pub fn output_path(
    content_root: &Path,
    content: &Path,
    style: &Path,
    output_root: &Path,
) -> Result<PathBuf, Error> {
    let rel = content.strip_prefix(content_root).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "'{}' is not inside '{}'",
                content.display(),
                content_root.display()
            ),
        )
    })?;

    let dir = match rel.parent() {
        Some(parent) => output_root.join(parent),
        None => output_root.to_owned(),
    };

    Ok(dir.join(stylized_file_name(content, style)))
}
