use std::f64::consts::{PI, TAU};
use std::ops::Add;

/// Rapidity assigned to massless particles travelling exactly along the beam axis, before the
/// `|pz|` offset that keeps such particles ordered.
const MAX_RAPIDITY: f64 = 1.0e5;

/// A relativistic four-momentum (px, py, pz, E), in GeV.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FourMomentum {
    px: f64,
    py: f64,
    pz: f64,
    e: f64,
}

impl FourMomentum {
    /// Creates a four-momentum from its Cartesian components.
    #[must_use]
    pub const fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Momentum along x.
    #[must_use]
    pub const fn px(&self) -> f64 {
        self.px
    }

    /// Momentum along y.
    #[must_use]
    pub const fn py(&self) -> f64 {
        self.py
    }

    /// Momentum along the beam axis.
    #[must_use]
    pub const fn pz(&self) -> f64 {
        self.pz
    }

    /// Energy.
    #[must_use]
    pub const fn e(&self) -> f64 {
        self.e
    }

    /// Returns the same four-momentum with every component multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.px * factor,
            self.py * factor,
            self.pz * factor,
            self.e * factor,
        )
    }

    /// Squared transverse momentum.
    #[must_use]
    pub fn pt2(&self) -> f64 {
        self.px.mul_add(self.px, self.py * self.py)
    }

    /// Transverse momentum.
    #[must_use]
    pub fn pt(&self) -> f64 {
        self.pt2().sqrt()
    }

    /// Squared invariant mass. May be slightly negative due to rounding.
    #[must_use]
    pub fn m2(&self) -> f64 {
        (self.e + self.pz) * (self.e - self.pz) - self.pt2()
    }

    /// Rapidity along the beam axis.
    ///
    /// Massless particles moving exactly along the beam get a large finite rapidity whose
    /// magnitude grows with `|pz|`, so they still order sensibly.
    #[must_use]
    pub fn rapidity(&self) -> f64 {
        let pt2 = self.pt2();

        #[expect(
            clippy::float_cmp,
            reason = "only an exactly beam-aligned massless momentum needs the guard"
        )]
        let along_beam = self.e == self.pz.abs() && pt2 == 0.0;

        if along_beam {
            let limit = MAX_RAPIDITY + self.pz.abs();
            return if self.pz >= 0.0 { limit } else { -limit };
        }

        let effective_m2 = self.m2().max(0.0);
        let e_plus_abs_pz = self.e + self.pz.abs();
        let magnitude = 0.5 * ((pt2 + effective_m2) / (e_plus_abs_pz * e_plus_abs_pz)).ln();

        if self.pz > 0.0 { -magnitude } else { magnitude }
    }

    /// Azimuthal angle in `[0, 2π)`. Zero for a momentum with no transverse component.
    #[must_use]
    pub fn phi(&self) -> f64 {
        if self.pt2() <= 0.0 {
            return 0.0;
        }

        let phi = self.py.atan2(self.px);

        if phi < 0.0 {
            phi + TAU
        } else if phi >= TAU {
            phi - TAU
        } else {
            phi
        }
    }
}

/// E-scheme recombination: four-vectors are summed component by component.
impl Add for FourMomentum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.px + rhs.px,
            self.py + rhs.py,
            self.pz + rhs.pz,
            self.e + rhs.e,
        )
    }
}

/// Azimuthal separation folded into `[0, π]`.
pub(crate) fn delta_phi(a: f64, b: f64) -> f64 {
    let dphi = (a - b).abs();
    if dphi > PI { TAU - dphi } else { dphi }
}
