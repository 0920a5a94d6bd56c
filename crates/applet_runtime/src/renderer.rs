use dockbus::{Result, Value};

use crate::icon::Icon;

/// Sub-type of a graph renderer, sent as its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
pub enum GraphType {
    Line,
    Plain,
    Bar,
    Circle,
    PlainCircle,
}

/// A data renderer drawn over the icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererKind {
    Gauge { theme: String },
    Graph(GraphType),
    Progress,
}

impl RendererKind {
    fn type_name(&self) -> &'static str {
        match self {
            RendererKind::Gauge { .. } => "gauge",
            RendererKind::Graph(_) => "graph",
            RendererKind::Progress => "progress",
        }
    }

    fn theme(&self) -> String {
        match self {
            RendererKind::Gauge { theme } => theme.clone(),
            RendererKind::Graph(graph) => (*graph as i32).to_string(),
            RendererKind::Progress => String::new(),
        }
    }

    /// Arguments of `AddDataRenderer` for a renderer showing `count` values.
    pub(crate) fn add_args(&self, count: i32) -> Vec<Value> {
        vec![Value::from(self.type_name()), Value::from(count), Value::from(self.theme())]
    }

    /// Whether going from `self` to `other` needs the current renderer removed first.
    pub(crate) fn needs_removal_for(&self, other: &RendererKind) -> bool {
        self.type_name() != other.type_name()
    }
}

/// Arguments of `AddDataRenderer` that remove the current renderer.
pub(crate) fn remove_args() -> Vec<Value> {
    vec![Value::from(""), Value::from(0), Value::from("")]
}

/// Clamp values into the [0, 1] range the dock expects.
pub(crate) fn normalized(values: &[f64]) -> Vec<Value> {
    vec![Value::List(values.iter().map(|v| Value::Float(v.clamp(0.0, 1.0))).collect())]
}

impl Icon {
    /// Show a renderer of `count` values over the icon, replacing the previous one.
    pub async fn add_data_renderer(&self, kind: RendererKind, count: i32) -> Result<()> {
        let previous = self.state().renderer.replace(kind.clone());
        if previous.map_or(false, |previous| previous.needs_removal_for(&kind)) {
            self.call("AddDataRenderer", remove_args()).await?;
        }
        self.call("AddDataRenderer", kind.add_args(count)).await.map(drop)
    }

    /// Push one value per renderer slot, each in the [0, 1] range.
    pub async fn render_values(&self, values: &[f64]) -> Result<()> {
        self.call("RenderValues", normalized(values)).await.map(drop)
    }

    pub async fn remove_data_renderer(&self) -> Result<()> {
        self.state().renderer = None;
        self.call("AddDataRenderer", remove_args()).await.map(drop)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_args() {
        assert_eq!(
            RendererKind::Graph(GraphType::Bar).add_args(2),
            vec![Value::from("graph"), Value::Int(2), Value::from("2")]
        );
        assert_eq!(
            RendererKind::Gauge { theme: "Turbo-night".into() }.add_args(1),
            vec![Value::from("gauge"), Value::Int(1), Value::from("Turbo-night")]
        );
        assert_eq!("plaincircle".parse::<GraphType>().unwrap(), GraphType::PlainCircle);
    }

    #[test]
    fn test_switching_kind_needs_removal() {
        let gauge = RendererKind::Gauge { theme: "a".into() };
        assert!(gauge.needs_removal_for(&RendererKind::Progress));
        assert!(!gauge.needs_removal_for(&RendererKind::Gauge { theme: "b".into() }));
        assert_eq!(normalized(&[1.5, -0.2, 0.3]), vec![Value::from(vec![1.0, 0.0, 0.3])]);
    }

    #[tokio::test]
    async fn test_renderer_switch_removes_previous() {
        let (bus, icon) = crate::icon::test::recording_icon();
        icon.add_data_renderer(RendererKind::Progress, 1).await.unwrap();
        icon.add_data_renderer(RendererKind::Progress, 1).await.unwrap();
        icon.add_data_renderer(RendererKind::Graph(GraphType::Line), 2).await.unwrap();
        icon.render_values(&[0.5, 2.0]).await.unwrap();

        let args: Vec<_> = bus.calls().into_iter().map(|c| c.args[0].to_string()).collect();
        assert_eq!(args, vec!["progress", "progress", "", "graph", "0.5;1"]);
    }
}
