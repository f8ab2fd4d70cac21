//! Static table of the node kinds the software backend implements.
//!
//! Kind ids are the positions in [`Kind::ALL`] and appear verbatim in encoded
//! trees, so the order is part of the encoding.

use noisegraph_core::{RawKindInfo, RawMember, RawVariable, VariableType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum VarTy {
    Float { default: f32, min: f32, max: f32 },
    Int { default: i32, min: i32, max: i32 },
    Enum { default: i32, names: &'static [&'static str] },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct VarSpec {
    pub name: &'static str,
    pub dimension: Option<u8>,
    pub ty: VarTy,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MemberSpec {
    pub name: &'static str,
    pub dimension: Option<u8>,
    /// Constant used by a hybrid until something is bound.
    pub default: f32,
}

#[derive(Debug)]
pub(crate) struct KindSpec {
    pub name: &'static str,
    pub variables: &'static [VarSpec],
    pub lookups: &'static [MemberSpec],
    pub hybrids: &'static [MemberSpec],
}

const fn float(name: &'static str, default: f32) -> VarSpec {
    VarSpec {
        name,
        dimension: None,
        ty: VarTy::Float {
            default,
            min: f32::MIN,
            max: f32::MAX,
        },
    }
}

const fn float_at(name: &'static str, dimension: u8, default: f32) -> VarSpec {
    VarSpec {
        name,
        dimension: Some(dimension),
        ty: VarTy::Float {
            default,
            min: f32::MIN,
            max: f32::MAX,
        },
    }
}

const fn positive(name: &'static str, default: f32) -> VarSpec {
    VarSpec {
        name,
        dimension: None,
        ty: VarTy::Float {
            default,
            min: f32::MIN_POSITIVE,
            max: f32::MAX,
        },
    }
}

const fn int(name: &'static str, default: i32, min: i32, max: i32) -> VarSpec {
    VarSpec {
        name,
        dimension: None,
        ty: VarTy::Int { default, min, max },
    }
}

const fn enumeration(name: &'static str, names: &'static [&'static str]) -> VarSpec {
    VarSpec {
        name,
        dimension: None,
        ty: VarTy::Enum { default: 0, names },
    }
}

const fn member(name: &'static str, default: f32) -> MemberSpec {
    MemberSpec {
        name,
        dimension: None,
        default,
    }
}

const fn member_at(name: &'static str, dimension: u8, default: f32) -> MemberSpec {
    MemberSpec {
        name,
        dimension: Some(dimension),
        default,
    }
}

pub(crate) const DISTANCE_FUNCTIONS: &[&str] =
    &["Euclidean", "Euclidean Squared", "Manhattan", "Chebyshev"];
pub(crate) const CELLULAR_RETURN_TYPES: &[&str] =
    &["Index0", "Index0 Add 1", "Index0 Sub 1", "Index0 Mul 1", "Index0 Div 1"];
pub(crate) const TERRACE_MODES: &[&str] = &["Linear", "Smooth"];

/// Number of nearest distances the cellular kind keeps per sample.
pub(crate) const CELLULAR_DISTANCE_SLOTS: i32 = 4;

const SOURCE: &[MemberSpec] = &[member("Source", 0.0)];
const LHS: &[MemberSpec] = &[member("LHS", 0.0)];
const RHS: &[MemberSpec] = &[member("RHS", 0.0)];

macro_rules! kinds {
    ($($variant:ident = $id:literal => $spec:expr,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub(crate) enum Kind {
            $($variant = $id,)*
        }

        impl Kind {
            pub(crate) const ALL: &'static [Kind] = &[$(Kind::$variant,)*];

            pub(crate) fn spec(self) -> &'static KindSpec {
                match self {
                    $(Kind::$variant => {
                        const SPEC: KindSpec = $spec;
                        &SPEC
                    })*
                }
            }
        }
    };
}

kinds! {
    Constant = 0 => KindSpec {
        name: "Constant",
        variables: &[float("Value", 1.0)],
        lookups: &[],
        hybrids: &[],
    },
    White = 1 => KindSpec {
        name: "White",
        variables: &[],
        lookups: &[],
        hybrids: &[],
    },
    Checkerboard = 2 => KindSpec {
        name: "Checkerboard",
        variables: &[positive("Size", 1.0)],
        lookups: &[],
        hybrids: &[],
    },
    Value = 3 => KindSpec {
        name: "Value",
        variables: &[],
        lookups: &[],
        hybrids: &[],
    },
    Perlin = 4 => KindSpec {
        name: "Perlin",
        variables: &[],
        lookups: &[],
        hybrids: &[],
    },
    Modulate = 5 => KindSpec {
        name: "Modulate",
        variables: &[],
        lookups: &[member("Source", 0.0), member("Modulator", 0.0)],
        hybrids: &[],
    },
    FractalFbm = 6 => KindSpec {
        name: "Fractal FBm",
        variables: &[int("Octaves", 3, 1, 16), float("Lacunarity", 2.0)],
        lookups: SOURCE,
        hybrids: &[member("Gain", 0.5)],
    },
    CellularDistance = 7 => KindSpec {
        name: "Cellular Distance",
        variables: &[
            enumeration("Distance Function", DISTANCE_FUNCTIONS),
            int("Distance Index 0", 0, 0, CELLULAR_DISTANCE_SLOTS - 1),
            int("Distance Index 1", 1, 0, CELLULAR_DISTANCE_SLOTS - 1),
            enumeration("Return Type", CELLULAR_RETURN_TYPES),
        ],
        lookups: &[],
        hybrids: &[member("Jitter Modifier", 1.0)],
    },
    SineWaves = 8 => KindSpec {
        name: "Sine Waves",
        variables: &[],
        lookups: &[],
        hybrids: &[member("Scale", 1.0)],
    },
    PositionOutput = 9 => KindSpec {
        name: "Position Output",
        variables: &[
            float_at("Multiplier", 0, 0.0),
            float_at("Multiplier", 1, 0.0),
            float_at("Multiplier", 2, 0.0),
            float_at("Multiplier", 3, 0.0),
            float_at("Offset", 0, 0.0),
            float_at("Offset", 1, 0.0),
            float_at("Offset", 2, 0.0),
            float_at("Offset", 3, 0.0),
        ],
        lookups: &[],
        hybrids: &[],
    },
    DomainScale = 10 => KindSpec {
        name: "Domain Scale",
        variables: &[float("Scale", 1.0)],
        lookups: SOURCE,
        hybrids: &[],
    },
    DomainOffset = 11 => KindSpec {
        name: "Domain Offset",
        variables: &[],
        lookups: SOURCE,
        hybrids: &[
            member_at("Offset", 0, 0.0),
            member_at("Offset", 1, 0.0),
            member_at("Offset", 2, 0.0),
            member_at("Offset", 3, 0.0),
        ],
    },
    AddDimension = 12 => KindSpec {
        name: "Add Dimension",
        variables: &[],
        lookups: SOURCE,
        hybrids: &[member("New Dimension Position", 0.0)],
    },
    Add = 13 => KindSpec {
        name: "Add",
        variables: &[],
        lookups: LHS,
        hybrids: RHS,
    },
    Subtract = 14 => KindSpec {
        name: "Subtract",
        variables: &[],
        lookups: &[],
        hybrids: &[member("LHS", 0.0), member("RHS", 0.0)],
    },
    Multiply = 15 => KindSpec {
        name: "Multiply",
        variables: &[],
        lookups: LHS,
        hybrids: RHS,
    },
    Min = 16 => KindSpec {
        name: "Min",
        variables: &[],
        lookups: LHS,
        hybrids: RHS,
    },
    Max = 17 => KindSpec {
        name: "Max",
        variables: &[],
        lookups: LHS,
        hybrids: RHS,
    },
    MaxSmooth = 18 => KindSpec {
        name: "Max Smooth",
        variables: &[],
        lookups: LHS,
        hybrids: &[member("RHS", 0.0), member("Smoothness", 0.1)],
    },
    Abs = 19 => KindSpec {
        name: "Abs",
        variables: &[],
        lookups: SOURCE,
        hybrids: &[],
    },
    Terrace = 20 => KindSpec {
        name: "Terrace",
        variables: &[enumeration("Mode", TERRACE_MODES), positive("Step Count", 4.0)],
        lookups: SOURCE,
        hybrids: &[],
    },
    Remap = 21 => KindSpec {
        name: "Remap",
        variables: &[
            float("From Min", -1.0),
            float("From Max", 1.0),
            float("To Min", 0.0),
            float("To Max", 1.0),
        ],
        lookups: SOURCE,
        hybrids: &[],
    },
}

impl Kind {
    pub(crate) fn from_id(id: u32) -> Option<Kind> {
        Kind::ALL.get(usize::try_from(id).ok()?).copied()
    }

    pub(crate) fn id(self) -> u16 {
        self as u16
    }

    pub(crate) fn describe(self) -> RawKindInfo {
        let spec = self.spec();
        RawKindInfo {
            name: spec.name.to_string(),
            variables: spec
                .variables
                .iter()
                .map(|v| RawVariable {
                    name: v.name.to_string(),
                    ty: match v.ty {
                        VarTy::Float { .. } => VariableType::Float,
                        VarTy::Int { .. } => VariableType::Int,
                        VarTy::Enum { .. } => VariableType::Enum,
                    },
                    dimension: v.dimension,
                    enum_names: match v.ty {
                        VarTy::Enum { names, .. } => names.iter().map(|n| n.to_string()).collect(),
                        _ => Vec::new(),
                    },
                })
                .collect(),
            node_lookups: spec.lookups.iter().map(raw_member).collect(),
            hybrids: spec.hybrids.iter().map(raw_member).collect(),
        }
    }
}

fn raw_member(m: &MemberSpec) -> RawMember {
    RawMember {
        name: m.name.to_string(),
        dimension: m.dimension,
    }
}
