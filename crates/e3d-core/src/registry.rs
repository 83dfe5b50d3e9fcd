//! Preset database
//!
//! Presets are addressed as `family:NAME`, where the family is a dotted path
//! such as `qfp.jedec`. The table is built explicitly at startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::mm;
use crate::generator::Generator;
use crate::generators::{
    BoxGenerator, BoxParams, DipGenerator, DipParams, QfnCase, QfnGenerator, QfnParams,
    QfpGenerator, QfpParams, RadialCapGenerator, RadialCapParams, SmdCapGenerator, SmdCapParams,
};

/// Registry lookup errors
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
    #[error("No components under: {0}")]
    UnknownFamily(String),
    #[error("Invalid component id '{0}', expected family:NAME")]
    InvalidId(String),
}

/// Parameter record of any package family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PackageParams {
    Box(BoxParams),
    Dip(DipParams),
    Qfn(QfnParams),
    Qfp(QfpParams),
    RadialCap(RadialCapParams),
    SmdCap(SmdCapParams),
}

impl PackageParams {
    /// Generator bound to a copy of these parameters
    pub fn generator(&self) -> Box<dyn Generator> {
        match self {
            PackageParams::Box(p) => Box::new(BoxGenerator::new(p.clone())),
            PackageParams::Dip(p) => Box::new(DipGenerator::new(p.clone())),
            PackageParams::Qfn(p) => Box::new(QfnGenerator::new(p.clone())),
            PackageParams::Qfp(p) => Box::new(QfpGenerator::new(p.clone())),
            PackageParams::RadialCap(p) => Box::new(RadialCapGenerator::new(p.clone())),
            PackageParams::SmdCap(p) => Box::new(SmdCapGenerator::new(p.clone())),
        }
    }
}

/// One named preset
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub family: &'static str,
    pub name: &'static str,
    pub params: PackageParams,
}

impl Entry {
    /// `family:NAME`
    pub fn id(&self) -> String {
        format!("{}:{}", self.family, self.name)
    }

    /// Relative directory the entry's files are written to
    pub fn output_dir(&self) -> PathBuf {
        output_dir(self.family)
    }
}

/// Map a dotted family path to a relative directory (`qfp.jedec` → `qfp/jedec`)
pub fn output_dir(family: &str) -> PathBuf {
    family.split('.').filter(|s| !s.is_empty()).collect()
}

/// Static table of presets, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a preset
    pub fn register(&mut self, family: &'static str, name: &'static str, params: PackageParams) {
        self.entries.push(Entry {
            family,
            name,
            params,
        });
    }

    /// Registry holding every built-in preset
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        register_test(&mut reg);
        register_dip(&mut reg);
        register_qfn(&mut reg);
        register_qfp(&mut reg);
        register_capacitors(&mut reg);
        reg
    }

    pub fn all(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `family:NAME`
    pub fn get(&self, id: &str) -> Result<&Entry, RegistryError> {
        let (family, name) = id
            .split_once(':')
            .filter(|(f, n)| !f.is_empty() && !n.is_empty())
            .ok_or_else(|| RegistryError::InvalidId(id.to_string()))?;
        self.entries
            .iter()
            .find(|e| e.family == family && e.name == name)
            .ok_or_else(|| RegistryError::UnknownComponent(id.to_string()))
    }

    /// Entries under a family prefix, or the single entry for `family:NAME`
    pub fn find(&self, pattern: &str) -> Result<Vec<&Entry>, RegistryError> {
        if pattern.contains(':') {
            return self.get(pattern).map(|e| vec![e]);
        }
        let found: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| in_family(e.family, pattern))
            .collect();
        if found.is_empty() {
            Err(RegistryError::UnknownFamily(pattern.to_string()))
        } else {
            Ok(found)
        }
    }

    /// Distinct family paths in declaration order
    pub fn families(&self) -> Vec<&'static str> {
        let mut families: Vec<&'static str> = Vec::new();
        for entry in &self.entries {
            if !families.contains(&entry.family) {
                families.push(entry.family);
            }
        }
        families
    }
}

/// Whether `family` is `prefix` or nested below it
fn in_family(family: &str, prefix: &str) -> bool {
    family == prefix
        || family
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn register_test(reg: &mut Registry) {
    let cubes = [
        ("cube5x5x5", 5.0, [1.0, 0.0, 0.0]),
        ("cube10x10x10", 10.0, [0.0, 1.0, 0.0]),
        ("cube15x15x15", 15.0, [0.0, 0.0, 1.0]),
    ];
    for (name, size, color) in cubes {
        reg.register("test", name, PackageParams::Box(BoxParams::cube(size, color)));
    }
}

fn register_dip(reg: &mut Registry) {
    let narrow = [
        ("DIP06", 7.05, 6),
        ("DIP08", 9.27, 8),
        ("DIP14", 19.05, 14),
        ("DIP16", mm(0.755), 16),
        ("DIP18", mm(0.9), 18),
        ("DIP20", mm(1.03), 20),
        ("DIP22", mm(1.1), 22),
        ("DIP24", mm(1.25), 24),
        ("DIP28", mm(1.4), 28),
    ];
    for (name, length, npins) in narrow {
        reg.register("dip", name, PackageParams::Dip(DipParams::dip300(length, npins)));
    }

    let wide = [
        ("DIP22_6", mm(1.1), 22),
        ("DIP24_6", mm(1.25), 24),
        ("DIP28_6", mm(1.4), 28),
        ("DIP32_6", mm(1.63), 32),
        ("DIP40_6", mm(2.0), 40),
        ("DIP48_6", mm(2.42), 48),
        ("DIP52_6", mm(2.6), 52),
    ];
    for (name, length, npins) in wide {
        reg.register("dip", name, PackageParams::Dip(DipParams::dip600(length, npins)));
    }
}

fn register_qfn(reg: &mut Registry) {
    reg.register(
        "qfn",
        "QFN16_3x3",
        PackageParams::Qfn(QfnParams {
            d: 3.0,
            e: 3.0,
            a: 0.9,
            a1: 0.02,
            b: 0.25,
            pitch: 0.5,
            npx: 4,
            npy: 4,
            epad: Some((1.7, 1.7)),
            case: QfnCase::Standard,
        }),
    );
    reg.register(
        "qfn",
        "MQFN24_4x4",
        PackageParams::Qfn(QfnParams {
            d: 4.0,
            e: 4.0,
            a: 0.9,
            a1: 0.02,
            b: 0.25,
            pitch: 0.5,
            npx: 6,
            npy: 6,
            epad: Some((2.5, 2.5)),
            case: QfnCase::Molded {
                d1: 3.75,
                e1: 3.75,
                draft: 12.0,
                chamfer: 0.42,
            },
        }),
    );
}

fn register_qfp(reg: &mut Registry) {
    // (name, D=E, D1=E1, b, pitch, pins per side)
    let jedec = [
        ("AKA", 6.0, 4.0, 0.32, 0.65, 5),
        ("ABD", 9.0, 7.0, 0.18, 0.4, 16),
        ("AFB", 22.0, 20.0, 0.22, 0.5, 36),
        ("ACB", 12.0, 10.0, 0.37, 0.8, 11),
        ("ACC", 12.0, 10.0, 0.32, 0.65, 13),
        ("ACE", 12.0, 10.0, 0.18, 0.4, 20),
        ("ADC", 14.0, 12.0, 0.32, 0.65, 13),
        ("ADD", 14.0, 12.0, 0.18, 0.5, 20),
        ("AEC", 16.0, 14.0, 0.32, 0.65, 20),
    ];
    for (name, size, body, b, pitch, npx) in jedec {
        reg.register(
            "qfp.jedec",
            name,
            PackageParams::Qfp(QfpParams::jedec(size, body, b, pitch, npx)),
        );
    }
}

fn register_capacitors(reg: &mut Registry) {
    // (name, D, L, F, lead diameter)
    let radial = [
        ("D4L7P1.5", 4.0, 7.0, 1.5, 0.45),
        ("D5L11P2", 5.0, 11.0, 2.0, 0.5),
        ("D6.3L11P2.5", 6.3, 11.0, 2.5, 0.5),
        ("D8L11.5P3.5", 8.0, 11.5, 3.5, 0.6),
        ("D10L12.5P5", 10.0, 12.5, 5.0, 0.6),
    ];
    for (name, d, l, f, lead_d) in radial {
        reg.register(
            "capacitor.radial",
            name,
            PackageParams::RadialCap(RadialCapParams::new(d, l, f, lead_d)),
        );
    }

    let smd = [
        ("D4H5.4", SmdCapParams::d4_h5_4()),
        ("D5H5.4", SmdCapParams::d5_h5_4()),
        ("D6.3H5.4", SmdCapParams::d6_3_h5_4()),
        ("D6.3H7.7", SmdCapParams::d6_3_h7_7()),
        ("D8H10", SmdCapParams::d8_h10()),
        ("D10H10", SmdCapParams::d10_h10()),
    ];
    for (name, params) in smd {
        reg.register("capacitor.smd", name, PackageParams::SmdCap(params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e3d_cad::ImplicitKernel;
    use std::collections::HashSet;
    use std::path::Path;

    #[test]
    fn test_ids_are_unique() {
        let reg = Registry::builtin();
        let ids: HashSet<String> = reg.all().iter().map(Entry::id).collect();
        assert_eq!(ids.len(), reg.len());
    }

    #[test]
    fn test_get() {
        let reg = Registry::builtin();
        let entry = reg.get("dip:DIP08").unwrap();
        assert_eq!(entry.params.generator().pin_count(), 8);
        assert_eq!(entry.params.generator().family(), "dip");

        assert!(matches!(reg.get("dip:DIP09"), Err(RegistryError::UnknownComponent(_))));
        assert!(matches!(reg.get("DIP08"), Err(RegistryError::InvalidId(_))));
        assert!(matches!(reg.get("dip:"), Err(RegistryError::InvalidId(_))));
    }

    #[test]
    fn test_find_by_prefix() {
        let reg = Registry::builtin();
        assert_eq!(reg.find("qfp").unwrap().len(), 9);
        assert_eq!(reg.find("qfp.jedec").unwrap().len(), 9);
        assert_eq!(reg.find("capacitor").unwrap().len(), 11);
        assert_eq!(reg.find("test:cube5x5x5").unwrap().len(), 1);
        // a prefix must end on a path boundary
        assert!(matches!(reg.find("qf"), Err(RegistryError::UnknownFamily(_))));
    }

    #[test]
    fn test_families_in_order() {
        let reg = Registry::builtin();
        assert_eq!(
            reg.families(),
            vec!["test", "dip", "qfn", "qfp.jedec", "capacitor.radial", "capacitor.smd"]
        );
    }

    #[test]
    fn test_output_dir() {
        assert_eq!(output_dir("qfp.jedec"), Path::new("qfp").join("jedec"));
        assert_eq!(output_dir("dip"), Path::new("dip"));
        let reg = Registry::builtin();
        let entry = reg.get("capacitor.smd:D8H10").unwrap();
        assert_eq!(entry.output_dir(), Path::new("capacitor").join("smd"));
    }

    #[test]
    fn test_quad_pin_counts() {
        let reg = Registry::builtin();
        for entry in reg.find("qfp").unwrap().into_iter().chain(reg.find("qfn").unwrap()) {
            let generator = entry.params.generator();
            let expected = match &entry.params {
                PackageParams::Qfp(p) => 2 * (p.npx + p.npy),
                PackageParams::Qfn(p) => 2 * (p.npx + p.npy),
                other => panic!("unexpected params {other:?}"),
            };
            assert_eq!(generator.pin_count(), expected, "{}", entry.id());
        }
    }

    #[test]
    fn test_every_preset_builds() {
        let reg = Registry::builtin();
        for entry in reg.all() {
            let kernel = ImplicitKernel::new();
            let model = entry
                .params
                .generator()
                .generate(&kernel)
                .unwrap_or_else(|e| panic!("{} failed: {e}", entry.id()));
            assert!(!model.is_empty(), "{}", entry.id());
        }
    }

    #[test]
    fn test_params_round_trip_through_ron() {
        let reg = Registry::builtin();
        let params = &reg.get("qfn:MQFN24_4x4").unwrap().params;
        let text = ron::to_string(params).unwrap();
        let back: PackageParams = ron::from_str(&text).unwrap();
        assert_eq!(&back, params);
    }
}
