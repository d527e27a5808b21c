//! Right sidebar design tab: measures, fill and stroke

use super::ColorPicker;
use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

/// Numeric inputs in the measures section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Width,
    Height,
    Radius,
    Rotation,
}

impl Measure {
    fn test_id(&self) -> &'static str {
        match self {
            Measure::Width => "width-input",
            Measure::Height => "height-input",
            Measure::Radius => "radius-input",
            Measure::Rotation => "rotation-input",
        }
    }
}

#[derive(Clone)]
pub struct DesignPanel {
    session: Session,
    fill: ColorPicker,
    stroke: ColorPicker,
}

impl DesignPanel {
    pub fn new(session: Session) -> Self {
        let root = session.test_id("design-panel");
        let fill = ColorPicker::new(session.clone(), root.test_id("fill-section"));
        let stroke = ColorPicker::new(session.clone(), root.test_id("stroke-section"));
        Self {
            session,
            fill,
            stroke,
        }
    }

    pub fn root(&self) -> Query {
        self.session.test_id("design-panel").describe("design panel")
    }

    pub fn measure(&self, measure: Measure) -> Query {
        self.root()
            .test_id(measure.test_id())
            .describe(format!("{measure:?} input"))
    }

    pub fn fill(&self) -> &ColorPicker {
        &self.fill
    }

    pub fn stroke(&self) -> &ColorPicker {
        &self.stroke
    }

    pub async fn set_measure(&self, measure: Measure, value: &str) -> E2eResult<()> {
        step(&format!("set {measure:?} to {value}"), async {
            let input = self.measure(measure);
            input.fill(value).await?;
            input.press("Enter").await
        })
        .await
    }

    pub async fn measure_value(&self, measure: Measure) -> E2eResult<String> {
        self.measure(measure).input_value().await
    }

    pub async fn expect_measure(&self, measure: Measure, value: &str) -> E2eResult<()> {
        self.measure(measure).expect().to_have_value(value).await
    }

    pub async fn set_fill_hex(&self, hex: &str) -> E2eResult<()> {
        step("set fill color", self.fill.set_hex(hex)).await
    }

    /// Resolved fill color, lowercase without `#`
    pub async fn fill_hex(&self) -> E2eResult<String> {
        self.fill.hex().await
    }
}
