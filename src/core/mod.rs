pub mod layout;
pub mod market_hours;
pub mod normalize;
pub mod positioning;
pub mod price_scale;
pub mod primitives;
pub mod types;

pub use layout::{
    FutureWindowConfig, Section, SectionGeometry, ViewportLayout, ViewportSplit,
};
pub use market_hours::{
    MARKET_TIME_ZONE, MarketHoursBounds, MarketHoursResolver, UsEquitySessionResolver,
};
pub use normalize::BucketKind;
pub use positioning::{
    CandleGeometry, CandleWidthConfig, CandleWidths, CoordinateMapper, PathPoint, PathSegment,
    PositioningRegime, VolumeBar,
};
pub use price_scale::{PriceScale, PriceScaleTuning};
pub use types::{ChartRange, PlotArea, PlotInsets, PricePoint, Sample, SessionKind, Viewport};
