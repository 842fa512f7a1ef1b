// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Hydration of structured records from flat decoded field maps.
//!
//! Each sub-record lists the fields it owns. For every field the driver
//! checks, in order:
//!
//! 1. composite handlers (correlation and IQ reshaping), whose failures
//!    propagate as [`DarnError::Hydration`]
//! 2. the alias table, for fields stored under a different key
//! 3. a verbatim copy from the key of the same name
//!
//! Copy failures on plain fields keep the field's default value so one
//! malformed field never discards the whole record.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::iq::SampleSeries;
use super::prm::OperatingParams;
use super::raw::LagSeries;
use crate::core::epoch_to_utc;
use crate::{Channel, DarnError, FieldMap, FieldValue, Result};

/// Fields stored on disk under a different key.
const ALIASES: [(&str, &str); 5] = [
    ("inttus", "intt.us"),
    ("inttsc", "intt.sc"),
    ("noisesky", "noise.sky"),
    ("noisesearch", "noise.search"),
    ("noisemean", "noise.mean"),
];

/// Key holding the interleaved IQ sample buffer.
const IQ_DATA_KEY: &str = "data";

/// A sub-record that can be filled from a flat field map.
pub(crate) trait Hydrate: Default {
    /// Fields owned by this sub-record, in declaration order.
    const FIELDS: &'static [&'static str];

    /// Fields reshaped from the flat map rather than copied.
    const COMPOSITE: &'static [&'static str] = &[];

    /// Copy one plain value into the named field.
    fn assign(&mut self, field: &str, value: &FieldValue) -> Result<()>;

    /// Build one composite field.
    fn compose(&mut self, _field: &str, _flat: &FieldMap, _prm: &OperatingParams) -> Result<()> {
        Ok(())
    }

    /// Derive fields that depend on others once all fields are set.
    fn finish(&mut self) {}
}

/// Key a field is read from.
pub(crate) fn source_key(field: &str) -> &str {
    ALIASES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, key)| *key)
        .unwrap_or(field)
}

/// Fill a fresh `T` from `flat`.
///
/// `prm` supplies the range-gate and lag counts used by correlation
/// reshaping.
pub(crate) fn hydrate<T: Hydrate>(flat: &FieldMap, prm: &OperatingParams) -> Result<T> {
    let mut target = T::default();
    for &field in T::FIELDS {
        if T::COMPOSITE.contains(&field) {
            target.compose(field, flat, prm)?;
            continue;
        }
        let Some(value) = flat.get(source_key(field)) else {
            continue;
        };
        if let Err(e) = target.assign(field, value) {
            debug!(
                context = "hydrate",
                field,
                error = %e,
                "Keeping default for malformed field"
            );
        }
    }
    target.finish();
    Ok(target)
}

/// Selector fields every record carries, read before full hydration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    /// Sounding time
    pub time: DateTime<Utc>,
    /// Station id
    pub stid: i32,
    /// Derived channel
    pub channel: Channel,
    /// Beam number
    pub bmnum: i32,
    /// Control program id
    pub cp: i32,
    /// Whether the record opens a new scan
    pub scan: bool,
}

impl RecordHeader {
    /// Extract the header from a flat record.
    ///
    /// Only `time` is mandatory; missing selectors read as zero.
    pub fn from_fields(flat: &FieldMap) -> Result<Self> {
        Ok(Self {
            time: decode_time(flat)?,
            stid: lenient_int(flat, "stid"),
            channel: decode_channel(flat.get("channel")),
            bmnum: lenient_int(flat, "bmnum"),
            cp: lenient_int(flat, "cp"),
            scan: lenient_int(flat, "scan") == 1,
        })
    }
}

fn lenient_int(flat: &FieldMap, key: &str) -> i32 {
    flat.get(key).and_then(FieldValue::as_i32).unwrap_or_default()
}

/// Convert the epoch-seconds `time` field to a UTC instant.
pub fn decode_time(flat: &FieldMap) -> Result<DateTime<Utc>> {
    let value = flat
        .get("time")
        .ok_or_else(|| DarnError::hydration("time", "record has no time field"))?;
    let secs = value.as_f64().ok_or_else(|| {
        DarnError::hydration("time", format!("expected epoch seconds, found {}", value.type_name()))
    })?;
    epoch_to_utc(secs)
        .ok_or_else(|| DarnError::hydration("time", format!("{secs} is not a valid instant")))
}

/// Derive the channel letter; absent values are channel `a`.
pub fn decode_channel(value: Option<&FieldValue>) -> Channel {
    match value {
        None => Channel::A,
        Some(FieldValue::String(s)) => s.chars().next().and_then(Channel::new).unwrap_or_default(),
        Some(v) => v.as_i64().map(Channel::from_raw).unwrap_or_default(),
    }
}

pub(crate) fn int(field: &str, value: &FieldValue) -> Result<i32> {
    value.as_i32().ok_or_else(|| mismatch(field, "integer", value))
}

pub(crate) fn float(field: &str, value: &FieldValue) -> Result<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| mismatch(field, "number", value))
}

pub(crate) fn ints(field: &str, value: &FieldValue) -> Result<Vec<i32>> {
    value
        .to_i32_vec()
        .ok_or_else(|| mismatch(field, "integer array", value))
}

pub(crate) fn floats(field: &str, value: &FieldValue) -> Result<Vec<f32>> {
    value
        .to_f64_vec()
        .map(|v| v.into_iter().map(|x| x as f32).collect())
        .ok_or_else(|| mismatch(field, "numeric array", value))
}

/// Split an integer array into rows of its innermost extent.
pub(crate) fn int_table(field: &str, value: &FieldValue) -> Result<Vec<Vec<i32>>> {
    let flat = ints(field, value)?;
    let inner = value
        .as_array()
        .and_then(|a| if a.dims.len() >= 2 { a.dims.last().copied() } else { None })
        .unwrap_or(1) as usize;
    if inner == 0 {
        return Ok(Vec::new());
    }
    Ok(flat.chunks(inner).map(<[i32]>::to_vec).collect())
}

fn mismatch(field: &str, expected: &str, found: &FieldValue) -> DarnError {
    DarnError::hydration(field, format!("expected {expected}, found {}", found.type_name()))
}

fn extent(field: &str, name: &str, value: i32) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| DarnError::hydration(field, format!("{name} is negative ({value})")))
}

/// Element count for a shape built from record fields.
fn element_count(field: &str, extents: &[usize]) -> Result<usize> {
    extents
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| DarnError::hydration(field, format!("shape {extents:?} overflows")))
}

/// Reshape a flat correlation array into `[nrang][mplgs][2]`.
///
/// Element `[i][j][k]` is taken from `flat[(i * mplgs + j) * 2 + k]`. An
/// absent field yields an empty series.
pub(crate) fn correlation(flat: &FieldMap, field: &str, prm: &OperatingParams) -> Result<LagSeries> {
    let Some(value) = flat.get(field) else {
        return Ok(Vec::new());
    };
    let data = value
        .to_f64_vec()
        .ok_or_else(|| mismatch(field, "numeric array", value))?;
    let gates = extent(field, "nrang", prm.nrang)?;
    let lags = extent(field, "mplgs", prm.mplgs)?;

    let needed = element_count(field, &[gates, lags, 2])?;
    if data.len() < needed {
        return Err(DarnError::hydration(
            field,
            format!(
                "{gates} gates x {lags} lags needs {needed} values, found {}",
                data.len()
            ),
        ));
    }

    Ok((0..gates)
        .map(|i| {
            (0..lags)
                .map(|j| {
                    let base = (i * lags + j) * 2;
                    [data[base] as f32, data[base + 1] as f32]
                })
                .collect()
        })
        .collect())
}

/// Which receiver array to extract from an IQ buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IqBank {
    Main,
    Interferometer,
}

/// Reshape the interleaved IQ buffer into `[seqnum][smpnum][2]`.
///
/// A buffer of exactly `smpnum * seqnum * 4` values holds both arrays,
/// one block of `smpnum` samples each, alternating per sequence. Any
/// other length holds the main array only, and the interferometer bank
/// comes back empty.
pub(crate) fn iq_samples(flat: &FieldMap, bank: IqBank) -> Result<SampleSeries> {
    let Some(value) = flat.get(IQ_DATA_KEY) else {
        return Ok(Vec::new());
    };
    let data = value
        .to_i32_vec()
        .ok_or_else(|| mismatch(IQ_DATA_KEY, "integer array", value))?;

    let count = |key: &str| -> Result<usize> {
        let v = flat
            .get(key)
            .and_then(FieldValue::as_i32)
            .ok_or_else(|| DarnError::hydration(IQ_DATA_KEY, format!("{key} is missing")))?;
        extent(IQ_DATA_KEY, key, v)
    };
    let smpnum = count("smpnum")?;
    let seqnum = count("seqnum")?;

    let single = element_count(IQ_DATA_KEY, &[smpnum, seqnum, 2])?;
    let doubled = single.checked_mul(2) == Some(data.len());
    if !doubled && data.len() < single {
        return Err(DarnError::hydration(
            IQ_DATA_KEY,
            format!(
                "{seqnum} sequences x {smpnum} samples needs {single} values, found {}",
                data.len()
            ),
        ));
    }

    let fac = if doubled { 2 } else { 1 };
    let row = match bank {
        IqBank::Main => 0,
        IqBank::Interferometer if doubled => 1,
        IqBank::Interferometer => return Ok(Vec::new()),
    };

    Ok((0..seqnum)
        .map(|i| {
            (0..smpnum)
                .map(|j| {
                    let base = ((i * fac + row) * smpnum + j) * 2;
                    [data[base], data[base + 1]]
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{ArrayValue, ValueKind};
    use crate::record::{FittedParams, IqSamples, RawSpectrum};

    fn float_array(values: impl IntoIterator<Item = f32>) -> FieldValue {
        FieldValue::Array(ArrayValue::new(
            ValueKind::Float,
            values.into_iter().map(FieldValue::Float).collect(),
        ))
    }

    fn short_array(values: impl IntoIterator<Item = i16>) -> FieldValue {
        FieldValue::Array(ArrayValue::new(
            ValueKind::Short,
            values.into_iter().map(FieldValue::Short).collect(),
        ))
    }

    fn prm(nrang: i32, mplgs: i32) -> OperatingParams {
        OperatingParams {
            nrang,
            mplgs,
            ..Default::default()
        }
    }

    #[test]
    fn test_aliases_read_dotted_keys() {
        let mut flat = FieldMap::new();
        flat.insert("intt.sc".into(), FieldValue::Short(3));
        flat.insert("intt.us".into(), FieldValue::Int(500_000));
        flat.insert("noise.sky".into(), FieldValue::Float(12.5));
        flat.insert("noise.search".into(), FieldValue::Float(1.0));
        flat.insert("noise.mean".into(), FieldValue::Float(2.0));
        // the undotted spelling is ignored
        flat.insert("inttsc".into(), FieldValue::Short(99));

        let p: OperatingParams = hydrate(&flat, &OperatingParams::default()).unwrap();
        assert_eq!(p.inttsc, 3);
        assert_eq!(p.inttus, 500_000);
        assert_eq!(p.noisesky, 12.5);
        assert_eq!(p.noisesearch, 1.0);
        assert_eq!(p.noisemean, 2.0);
        assert!((p.integration_secs() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_plain_field_keeps_default() {
        let mut flat = FieldMap::new();
        flat.insert("nave".into(), FieldValue::String("many".into()));
        flat.insert("nrang".into(), FieldValue::Short(75));
        let p: OperatingParams = hydrate(&flat, &OperatingParams::default()).unwrap();
        assert_eq!(p.nave, 0);
        assert_eq!(p.nrang, 75);
    }

    #[test]
    fn test_correlation_reshape_indexing() {
        let (gates, lags) = (3usize, 4usize);
        let mut flat = FieldMap::new();
        flat.insert(
            "acfd".into(),
            float_array((0..gates * lags * 2).map(|v| v as f32)),
        );

        let raw: RawSpectrum = hydrate(&flat, &prm(gates as i32, lags as i32)).unwrap();
        assert_eq!(raw.acfd.len(), gates);
        for i in 0..gates {
            assert_eq!(raw.acfd[i].len(), lags);
            for j in 0..lags {
                for k in 0..2 {
                    assert_eq!(raw.acfd[i][j][k], ((i * lags + j) * 2 + k) as f32);
                }
            }
        }
        assert!(raw.xcfd.is_empty());
    }

    #[test]
    fn test_short_correlation_is_hydration_error() {
        let mut flat = FieldMap::new();
        flat.insert("xcfd".into(), float_array([0.0; 10]));
        let err = hydrate::<RawSpectrum>(&flat, &prm(3, 4)).unwrap_err();
        assert!(matches!(err, DarnError::Hydration { ref field, .. } if field == "xcfd"));
    }

    #[test]
    fn test_iq_single_array() {
        let mut flat = FieldMap::new();
        flat.insert("seqnum".into(), FieldValue::Int(2));
        flat.insert("smpnum".into(), FieldValue::Int(3));
        flat.insert("data".into(), short_array(0..12));

        let iq: IqSamples = hydrate(&flat, &OperatingParams::default()).unwrap();
        assert_eq!(iq.main_data.len(), 2);
        assert_eq!(iq.main_data[1][2], [10, 11]);
        assert!(!iq.has_interferometer());
    }

    #[test]
    fn test_iq_doubled_buffer_splits_banks() {
        let (seqnum, smpnum) = (2usize, 3usize);
        let mut flat = FieldMap::new();
        flat.insert("seqnum".into(), FieldValue::Int(seqnum as i32));
        flat.insert("smpnum".into(), FieldValue::Int(smpnum as i32));
        flat.insert(
            "data".into(),
            short_array((0..(seqnum * smpnum * 4) as i16).collect::<Vec<_>>()),
        );

        let iq: IqSamples = hydrate(&flat, &OperatingParams::default()).unwrap();
        for i in 0..seqnum {
            for j in 0..smpnum {
                for k in 0..2 {
                    let main = ((i * 2 * smpnum + j) * 2 + k) as i32;
                    let int = (((i * 2 + 1) * smpnum + j) * 2 + k) as i32;
                    assert_eq!(iq.main_data[i][j][k], main);
                    assert_eq!(iq.int_data[i][j][k], int);
                }
            }
        }
    }

    #[test]
    fn test_iq_without_counts_is_hydration_error() {
        let mut flat = FieldMap::new();
        flat.insert("data".into(), short_array([1, 2]));
        assert!(hydrate::<IqSamples>(&flat, &OperatingParams::default()).is_err());
    }

    #[test]
    fn test_huge_extents_are_hydration_errors() {
        assert!(element_count("acfd", &[usize::MAX, 2]).is_err());
        assert_eq!(element_count("acfd", &[3, 4, 2]).unwrap(), 24);

        let mut flat = FieldMap::new();
        flat.insert("seqnum".into(), FieldValue::Int(i32::MAX));
        flat.insert("smpnum".into(), FieldValue::Int(i32::MAX));
        flat.insert("data".into(), short_array([1, 2]));
        let err = hydrate::<IqSamples>(&flat, &OperatingParams::default()).unwrap_err();
        assert!(matches!(err, DarnError::Hydration { .. }));

        let mut flat = FieldMap::new();
        flat.insert("acfd".into(), float_array([0.0; 4]));
        let err = hydrate::<RawSpectrum>(&flat, &prm(i32::MAX, i32::MAX)).unwrap_err();
        assert!(matches!(err, DarnError::Hydration { ref field, .. } if field == "acfd"));
    }

    #[test]
    fn test_fit_npnts_follows_slist() {
        let mut flat = FieldMap::new();
        flat.insert("slist".into(), short_array([4, 5, 9]));
        flat.insert("v".into(), float_array([100.0, -50.0, 3.0]));
        flat.insert("gflg".into(), FieldValue::Array(ArrayValue::new(
            ValueKind::Char,
            vec![FieldValue::Char(0), FieldValue::Char(1), FieldValue::Char(0)],
        )));

        let fit: FittedParams = hydrate(&flat, &OperatingParams::default()).unwrap();
        assert_eq!(fit.npnts, 3);
        assert!(fit.is_ground_scatter(1));
        assert!(!fit.is_ground_scatter(7));
        assert_eq!(fit.velocities().nth(1), Some((5, -50.0)));
    }

    #[test]
    fn test_decode_channel() {
        assert_eq!(decode_channel(None), Channel::A);
        assert_eq!(decode_channel(Some(&FieldValue::Short(2))).as_char(), 'b');
        assert_eq!(decode_channel(Some(&FieldValue::Short(1))).as_char(), 'a');
        assert_eq!(
            decode_channel(Some(&FieldValue::String("c".into()))).as_char(),
            'c'
        );
    }

    #[test]
    fn test_header_requires_time() {
        let mut flat = FieldMap::new();
        flat.insert("stid".into(), FieldValue::Short(33));
        assert!(RecordHeader::from_fields(&flat).is_err());

        flat.insert("time".into(), FieldValue::Double(1_351_728_000.0));
        flat.insert("scan".into(), FieldValue::Short(1));
        let header = RecordHeader::from_fields(&flat).unwrap();
        assert_eq!(header.stid, 33);
        assert!(header.scan);
        assert_eq!(header.channel, Channel::A);
    }

    #[test]
    fn test_ltab_rows() {
        let value = FieldValue::Array(ArrayValue::with_dims(
            ValueKind::Short,
            vec![3, 2],
            (0..6).map(FieldValue::Short).collect(),
        ));
        assert_eq!(
            int_table("ltab", &value).unwrap(),
            vec![vec![0, 1], vec![2, 3], vec![4, 5]]
        );
    }
}
