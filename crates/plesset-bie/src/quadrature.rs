//! Fixed quadrature rule tables.
//!
//! One-dimensional Gauss-Legendre rules on [0, 1] and symmetric triangle
//! rules on the reference triangle {x ≥ 0, y ≥ 0, x + y ≤ 1}. Triangle
//! weights sum to 1/2 (the reference area), so integrals pick up only
//! the element Jacobian. Rules are named by point count, matching the
//! orders used throughout the solver: the 3-point rules are the
//! integrator defaults, the 7-point rules drive production assembly,
//! and the 19-point triangle rule (degree 9) serves the exterior
//! potential evaluation.

/// One node of a 1-D rule on [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct LineNode {
    /// Abscissa in [0, 1].
    pub x: f64,
    /// Weight (the rule's weights sum to 1).
    pub w: f64,
}

/// One node of a triangle rule on the reference triangle.
#[derive(Debug, Clone, Copy)]
pub struct TriNode {
    /// First coordinate.
    pub x: f64,
    /// Second coordinate.
    pub y: f64,
    /// Weight (the rule's weights sum to 1/2).
    pub w: f64,
}

/// 3-point Gauss-Legendre rule (degree 5).
pub static GAUSS_3: [LineNode; 3] = [
    LineNode { x: 0.112_701_665_379_258_31, w: 0.277_777_777_777_777_78 },
    LineNode { x: 0.5, w: 0.444_444_444_444_444_44 },
    LineNode { x: 0.887_298_334_620_741_7, w: 0.277_777_777_777_777_78 },
];

/// 5-point Gauss-Legendre rule (degree 9).
pub static GAUSS_5: [LineNode; 5] = [
    LineNode { x: 0.046_910_077_030_668_00, w: 0.118_463_442_528_094_54 },
    LineNode { x: 0.230_765_344_947_158_45, w: 0.239_314_335_249_683_24 },
    LineNode { x: 0.5, w: 0.284_444_444_444_444_44 },
    LineNode { x: 0.769_234_655_052_841_55, w: 0.239_314_335_249_683_24 },
    LineNode { x: 0.953_089_922_969_332_00, w: 0.118_463_442_528_094_54 },
];

/// 7-point Gauss-Legendre rule (degree 13).
pub static GAUSS_7: [LineNode; 7] = [
    LineNode { x: 0.025_446_043_828_620_74, w: 0.064_742_483_084_434_85 },
    LineNode { x: 0.129_234_407_200_302_78, w: 0.139_852_695_744_638_33 },
    LineNode { x: 0.297_077_424_311_301_42, w: 0.190_915_025_252_559_46 },
    LineNode { x: 0.5, w: 0.208_979_591_836_734_69 },
    LineNode { x: 0.702_922_575_688_698_58, w: 0.190_915_025_252_559_46 },
    LineNode { x: 0.870_765_592_799_697_22, w: 0.139_852_695_744_638_33 },
    LineNode { x: 0.974_553_956_171_379_26, w: 0.064_742_483_084_434_85 },
];

/// 1-point centroid rule (degree 1).
pub static TRI_1: [TriNode; 1] = [TriNode {
    x: 1.0 / 3.0,
    y: 1.0 / 3.0,
    w: 0.5,
}];

/// 3-point symmetric rule (degree 2).
pub static TRI_3: [TriNode; 3] = [
    TriNode { x: 1.0 / 6.0, y: 1.0 / 6.0, w: 1.0 / 6.0 },
    TriNode { x: 2.0 / 3.0, y: 1.0 / 6.0, w: 1.0 / 6.0 },
    TriNode { x: 1.0 / 6.0, y: 2.0 / 3.0, w: 1.0 / 6.0 },
];

/// 7-point symmetric rule (degree 5, Radon).
pub static TRI_7: [TriNode; 7] = [
    TriNode { x: 1.0 / 3.0, y: 1.0 / 3.0, w: 0.112_5 },
    TriNode { x: 0.059_715_871_789_770, y: 0.470_142_064_105_115, w: 0.066_197_076_394_253 },
    TriNode { x: 0.470_142_064_105_115, y: 0.059_715_871_789_770, w: 0.066_197_076_394_253 },
    TriNode { x: 0.470_142_064_105_115, y: 0.470_142_064_105_115, w: 0.066_197_076_394_253 },
    TriNode { x: 0.797_426_985_353_087, y: 0.101_286_507_323_456, w: 0.062_969_590_272_413_5 },
    TriNode { x: 0.101_286_507_323_456, y: 0.797_426_985_353_087, w: 0.062_969_590_272_413_5 },
    TriNode { x: 0.101_286_507_323_456, y: 0.101_286_507_323_456, w: 0.062_969_590_272_413_5 },
];

/// 19-point symmetric rule (degree 9, Dunavant).
pub static TRI_19: [TriNode; 19] = [
    TriNode { x: 1.0 / 3.0, y: 1.0 / 3.0, w: 0.048_567_898_141_399_5 },
    // (0.020634961602525, 0.489682519198738, 0.489682519198738)
    TriNode { x: 0.489_682_519_198_738, y: 0.489_682_519_198_738, w: 0.015_667_350_113_569_5 },
    TriNode { x: 0.020_634_961_602_525, y: 0.489_682_519_198_738, w: 0.015_667_350_113_569_5 },
    TriNode { x: 0.489_682_519_198_738, y: 0.020_634_961_602_525, w: 0.015_667_350_113_569_5 },
    // (0.125820817014127, 0.437089591492937, 0.437089591492937)
    TriNode { x: 0.437_089_591_492_937, y: 0.437_089_591_492_937, w: 0.038_913_770_502_387_0 },
    TriNode { x: 0.125_820_817_014_127, y: 0.437_089_591_492_937, w: 0.038_913_770_502_387_0 },
    TriNode { x: 0.437_089_591_492_937, y: 0.125_820_817_014_127, w: 0.038_913_770_502_387_0 },
    // (0.623592928761935, 0.188203535619033, 0.188203535619033)
    TriNode { x: 0.188_203_535_619_033, y: 0.188_203_535_619_033, w: 0.039_823_869_463_605_0 },
    TriNode { x: 0.623_592_928_761_935, y: 0.188_203_535_619_033, w: 0.039_823_869_463_605_0 },
    TriNode { x: 0.188_203_535_619_033, y: 0.623_592_928_761_935, w: 0.039_823_869_463_605_0 },
    // (0.910540973211095, 0.044729513394453, 0.044729513394453)
    TriNode { x: 0.044_729_513_394_453, y: 0.044_729_513_394_453, w: 0.012_788_837_829_349_0 },
    TriNode { x: 0.910_540_973_211_095, y: 0.044_729_513_394_453, w: 0.012_788_837_829_349_0 },
    TriNode { x: 0.044_729_513_394_453, y: 0.910_540_973_211_095, w: 0.012_788_837_829_349_0 },
    // (0.036838412054736, 0.221962989160766, 0.741198598784498), all six
    TriNode { x: 0.221_962_989_160_766, y: 0.741_198_598_784_498, w: 0.021_641_769_688_644_5 },
    TriNode { x: 0.741_198_598_784_498, y: 0.221_962_989_160_766, w: 0.021_641_769_688_644_5 },
    TriNode { x: 0.036_838_412_054_736, y: 0.741_198_598_784_498, w: 0.021_641_769_688_644_5 },
    TriNode { x: 0.741_198_598_784_498, y: 0.036_838_412_054_736, w: 0.021_641_769_688_644_5 },
    TriNode { x: 0.036_838_412_054_736, y: 0.221_962_989_160_766, w: 0.021_641_769_688_644_5 },
    TriNode { x: 0.221_962_989_160_766, y: 0.036_838_412_054_736, w: 0.021_641_769_688_644_5 },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn line_weight_sum(rule: &[LineNode]) -> f64 {
        rule.iter().map(|n| n.w).sum()
    }

    fn tri_weight_sum(rule: &[TriNode]) -> f64 {
        rule.iter().map(|n| n.w).sum()
    }

    #[test]
    fn test_line_rules_integrate_constants() {
        for rule in [&GAUSS_3[..], &GAUSS_5[..], &GAUSS_7[..]] {
            approx::assert_relative_eq!(line_weight_sum(rule), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_line_rules_integrate_polynomials() {
        // ∫₀¹ x^5 dx = 1/6, exact for all three rules
        for rule in [&GAUSS_3[..], &GAUSS_5[..], &GAUSS_7[..]] {
            let val: f64 = rule.iter().map(|n| n.w * n.x.powi(5)).sum();
            approx::assert_relative_eq!(val, 1.0 / 6.0, epsilon = 1e-13);
        }
        // ∫₀¹ x^9 dx = 1/10, exact for the 5- and 7-point rules
        for rule in [&GAUSS_5[..], &GAUSS_7[..]] {
            let val: f64 = rule.iter().map(|n| n.w * n.x.powi(9)).sum();
            approx::assert_relative_eq!(val, 0.1, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_triangle_rules_integrate_constants() {
        for rule in [&TRI_1[..], &TRI_3[..], &TRI_7[..], &TRI_19[..]] {
            approx::assert_relative_eq!(tri_weight_sum(rule), 0.5, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_triangle_rules_integrate_monomials() {
        // ∫ x² over the reference triangle = 1/12
        for rule in [&TRI_3[..], &TRI_7[..], &TRI_19[..]] {
            let val: f64 = rule.iter().map(|n| n.w * n.x * n.x).sum();
            approx::assert_relative_eq!(val, 1.0 / 12.0, epsilon = 1e-13);
        }
        // ∫ x²y³ = 1/420, needs degree 5
        for rule in [&TRI_7[..], &TRI_19[..]] {
            let val: f64 = rule.iter().map(|n| n.w * n.x * n.x * n.y.powi(3)).sum();
            approx::assert_relative_eq!(val, 1.0 / 420.0, epsilon = 1e-13);
        }
        // ∫ x⁴y⁵ = 4!·5!/11! = 1/13860, needs degree 9
        let val: f64 = TRI_19
            .iter()
            .map(|n| n.w * n.x.powi(4) * n.y.powi(5))
            .sum();
        approx::assert_relative_eq!(val, 1.0 / 13860.0, epsilon = 1e-12);
    }
}
