//! Horizontal interval arithmetic on the strip.

/// Anything occupying a horizontal interval `[left, right)`.
pub trait Span {
    fn left(&self) -> i32;

    fn width(&self) -> i32;

    fn right(&self) -> i32 {
        self.left() + self.width()
    }
}

/// A plain horizontal interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub x: i32,
    pub width: i32,
}

impl Range {
    pub fn new(x: i32, width: i32) -> Self {
        Self { x, width }
    }

    /// Smallest range from `left`'s left edge to `right`'s right edge.
    pub fn from_union(left: &impl Span, right: &impl Span) -> Self {
        let x = left.left();
        Self::new(x, right.right() - x)
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains(&self, other: &impl Span) -> bool {
        contains(self, other)
    }

    /// Whether `other` overlaps this range at all.
    pub fn overlaps(&self, other: &impl Span) -> bool {
        other.right() > self.x && other.left() < self.right()
    }

    /// Grows the range by `amount` on both sides.
    pub fn expanded(&self, amount: i32) -> Self {
        Self::new(self.x - amount, self.width + 2 * amount)
    }
}

impl Span for Range {
    fn left(&self) -> i32 {
        self.x
    }

    fn width(&self) -> i32 {
        self.width
    }
}

/// Both edges of `child` lie within `parent`.
pub fn contains(parent: &impl Span, child: &impl Span) -> bool {
    child.left() >= parent.left() && child.right() <= parent.right()
}

/// Signed distance from `b`'s center to `a`'s center, rounded half up.
pub fn center_delta(a: &impl Span, b: &impl Span) -> i32 {
    let a_center = f64::from(a.left()) + f64::from(a.width()) / 2.;
    let b_center = f64::from(b.left()) + f64::from(b.width()) / 2.;
    (a_center - b_center + 0.5).floor() as i32
}
