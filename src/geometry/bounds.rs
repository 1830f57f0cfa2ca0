use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in screen pixels.
///
/// Always satisfies `left <= right` and `top <= bottom`; anything that would
/// break that collapses to [`Bounds::ZERO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Build a rectangle, normalizing inverted coordinates to `ZERO`.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        if left > right || top > bottom {
            return Bounds::ZERO;
        }
        Bounds {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_zero(&self) -> bool {
        *self == Bounds::ZERO
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.left as f64 + self.right as f64) / 2.0,
            (self.top as f64 + self.bottom as f64) / 2.0,
        )
    }

    /// True iff the whole rectangle lies on screen. A partially off-screen
    /// element counts as invisible.
    pub fn is_visible(&self, screen_w: i32, screen_h: i32) -> bool {
        (0..screen_w).contains(&self.left)
            && (0..screen_h).contains(&self.top)
            && self.right <= screen_w
            && self.bottom <= screen_h
    }

    /// `[l,t][r,b]`, the uiautomator wire form.
    pub fn to_wire(&self) -> String {
        format!(
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Parse the `"[l,t][r,b]"` form used by uiautomator dumps.
///
/// Never fails: missing brackets, wrong arity or non-numeric parts all yield
/// [`Bounds::ZERO`].
pub fn parse_bounds(raw: &str) -> Bounds {
    parse_bounds_strict(raw).unwrap_or(Bounds::ZERO)
}

fn parse_bounds_strict(raw: &str) -> Option<Bounds> {
    let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?;
    let (first, second) = inner.split_once("][")?;

    let mut numbers = first
        .split(',')
        .chain(second.split(','))
        .map(|part| part.trim().parse::<i32>());

    let left = numbers.next()?.ok()?;
    let top = numbers.next()?.ok()?;
    let right = numbers.next()?.ok()?;
    let bottom = numbers.next()?.ok()?;
    if numbers.next().is_some() {
        return None;
    }

    Some(Bounds::new(left, top, right, bottom))
}

/// Where a label sits relative to an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

impl Direction {
    /// Evaluation order for [`relative_direction`]; also the prompt order.
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `label` relative to `element`.
///
/// The label must lie entirely beyond one edge of the element and its centre
/// must fall within the element's span on the other axis. Predicates are
/// tried in the order top, bottom, left, right; the first match wins.
pub fn relative_direction(element: &Bounds, label: &Bounds) -> Option<Direction> {
    let (cx, cy) = label.center();
    let within_x = element.left as f64 <= cx && cx <= element.right as f64;
    let within_y = element.top as f64 <= cy && cy <= element.bottom as f64;

    if label.bottom <= element.top && within_x {
        return Some(Direction::Top);
    }
    if label.top >= element.bottom && within_x {
        return Some(Direction::Bottom);
    }
    if label.right <= element.left && within_y {
        return Some(Direction::Left);
    }
    if label.left >= element.right && within_y {
        return Some(Direction::Right);
    }
    None
}

/// Centre-to-centre gap along the axis that matters for `direction`.
pub fn axis_distance(element: &Bounds, label: &Bounds, direction: Direction) -> f64 {
    let (ex, ey) = element.center();
    let (lx, ly) = label.center();
    if direction.is_horizontal() {
        (ex - lx).abs()
    } else {
        (ey - ly).abs()
    }
}
