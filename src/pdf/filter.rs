//! Stream decoding for the streams the reader has to look inside:
//! cross-reference streams and object streams.
//!
//! Only `FlateDecode` with optional PNG or TIFF predictors is supported. Page
//! content and image streams are never decoded; they are copied verbatim.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use crate::pdf::object::{Dictionary, Object, Stream};

/// Why a stream payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("unsupported filter {0}")]
    Unsupported(String),

    #[error("corrupt stream data: {0}")]
    Corrupt(String),
}

/// Decode a stream payload according to its `/Filter` and `/DecodeParms`.
pub fn decode_stream(stream: &Stream) -> Result<Vec<u8>, FilterError> {
    let filters: Vec<&[u8]> = match stream.dict.get(b"Filter") {
        None | Some(Object::Null) => Vec::new(),
        Some(Object::Name(name)) => vec![name.as_slice()],
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_name()
                    .map_err(|_| FilterError::Corrupt("non-name entry in /Filter".into()))
            })
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(FilterError::Corrupt(format!(
                "/Filter is a {}",
                other.type_name()
            )));
        }
    };

    let params: Vec<Option<&Dictionary>> = match stream.dict.get(b"DecodeParms") {
        Some(Object::Dictionary(dict)) => vec![Some(dict)],
        Some(Object::Array(items)) => items.iter().map(|item| item.as_dict().ok()).collect(),
        _ => Vec::new(),
    };

    let mut data = stream.content.clone();
    for (index, filter) in filters.iter().enumerate() {
        data = match *filter {
            b"FlateDecode" | b"Fl" => {
                let inflated = inflate(&data)?;
                match params.get(index).copied().flatten() {
                    Some(parms) => apply_predictor(inflated, &PredictorParams::from_dict(parms))?,
                    None => inflated,
                }
            }
            other => {
                return Err(FilterError::Unsupported(
                    String::from_utf8_lossy(other).into_owned(),
                ));
            }
        };
    }
    Ok(data)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(zlib_err) => {
            // Some producers omit the zlib header.
            out.clear();
            DeflateDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|_| FilterError::Corrupt(format!("flate: {zlib_err}")))?;
            Ok(out)
        }
    }
}

/// `/DecodeParms` entries relevant to predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub fn from_dict(dict: &Dictionary) -> Self {
        let defaults = Self::default();
        let get = |key: &[u8], default: usize| {
            dict.get(key)
                .and_then(|value| value.as_i64().ok())
                .and_then(|value| usize::try_from(value).ok())
                .filter(|&value| value > 0)
                .unwrap_or(default)
        };
        Self {
            predictor: dict
                .get(b"Predictor")
                .and_then(|value| value.as_i64().ok())
                .unwrap_or(defaults.predictor),
            colors: get(b"Colors", defaults.colors),
            bits_per_component: get(b"BitsPerComponent", defaults.bits_per_component),
            columns: get(b"Columns", defaults.columns),
        }
    }

    /// Bytes per pixel and per row, refusing sizes no real stream uses.
    fn row_layout(&self) -> Result<(usize, usize), FilterError> {
        let bits_per_pixel = self.colors.checked_mul(self.bits_per_component);
        let bits_per_row = bits_per_pixel.and_then(|bits| bits.checked_mul(self.columns));
        match (bits_per_pixel, bits_per_row) {
            (Some(pixel), Some(row)) if row.div_ceil(8) <= MAX_ROW_LEN => {
                Ok((pixel.div_ceil(8), row.div_ceil(8)))
            }
            _ => Err(FilterError::Corrupt(format!(
                "predictor row of {} columns x {} colors x {} bits is too large",
                self.columns, self.colors, self.bits_per_component
            ))),
        }
    }
}

/// Upper bound on one predictor row.
const MAX_ROW_LEN: usize = 1 << 20;

/// Undo a PNG (10-15) or TIFF (2) predictor.
pub fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    match params.predictor {
        1 => Ok(data),
        2 => decode_tiff(&data, params),
        10..=15 => decode_png(&data, params),
        other => Err(FilterError::Unsupported(format!("predictor {other}"))),
    }
}

fn decode_tiff(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    if params.bits_per_component != 8 {
        return Err(FilterError::Unsupported(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }
    let (pixel, row_len) = params.row_layout()?;
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_len) {
        for i in pixel..row.len() {
            row[i] = row[i].wrapping_add(row[i - pixel]);
        }
    }
    Ok(out)
}

fn decode_png(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    let (pixel, row_len) = params.row_layout()?;
    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&tag, encoded) = chunk
            .split_first()
            .ok_or_else(|| FilterError::Corrupt("empty predictor row".into()))?;
        // A short final row is zero-padded.
        let mut row = encoded.to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= pixel { row[i - pixel] } else { 0 };
            let up = previous[i];
            let up_left = if i >= pixel { previous[i - pixel] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(FilterError::Corrupt(format!("PNG row filter {other}")));
                }
            };
            row[i] = row[i].wrapping_add(predicted);
        }

        out.extend_from_slice(&row);
        previous = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
