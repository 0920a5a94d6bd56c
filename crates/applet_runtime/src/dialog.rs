//! Dialogs popped on the icon, and the handling of their answer.
//!
//! Only one dialog can wait for an answer: popping a new one replaces the callback of the previous one.

use std::collections::BTreeMap;

use dockbus::Value;
use futures::{future::BoxFuture, Future, FutureExt};

/// Everything needed to pop a dialog with `PopupDialog`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogData {
    pub message: String,
    pub icon: String,
    /// Seconds before the dialog closes itself, 0 to keep it open.
    pub time_length: i32,
    pub force_above: bool,
    pub use_markup: bool,
    /// Button labels or icon names, separated by `;`.
    pub buttons: String,
    pub widget: Option<DialogWidget>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogWidget {
    Text(TextWidget),
    Scale(ScaleWidget),
    List(ListWidget),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextWidget {
    pub multi_lines: bool,
    pub locked: bool,
    pub hidden: bool,
    pub nb_chars: i32,
    pub initial_value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleWidget {
    pub min_value: f64,
    pub max_value: f64,
    pub nb_digit: i32,
    pub initial_value: f64,
    pub min_label: String,
    pub max_label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListWidget {
    pub editable: bool,
    pub values: Vec<String>,
    pub initial: ListInitial,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ListInitial {
    #[default]
    None,
    Index(i32),
    Text(String),
}

/// The value a dialog answered with, typed after the widget it carried.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogValue {
    None,
    Text(String),
    Float(f64),
    Index(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogAnswer {
    pub button: i32,
    pub value: DialogValue,
}

impl DialogAnswer {
    /// The first button, or Enter (-1). Escape is -2.
    pub fn is_ok(&self) -> bool {
        self.button == 0 || self.button == -1
    }
}

pub type DialogCallback = Box<dyn FnOnce(DialogAnswer) -> BoxFuture<'static, ()> + Send>;

pub fn dialog_callback<F, Fut>(f: F) -> DialogCallback
where
    F: FnOnce(DialogAnswer) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |answer| f(answer).boxed())
}

/// Run `f` when the dialog was validated.
pub fn on_ok<F, Fut>(f: F) -> DialogCallback
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    dialog_callback(move |answer: DialogAnswer| async move {
        if answer.is_ok() {
            f().await
        }
    })
}

/// Run `f` with the selected index when a fixed list dialog was validated.
pub fn on_valid_int<F, Fut>(f: F) -> DialogCallback
where
    F: FnOnce(i32) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    dialog_callback(move |answer: DialogAnswer| async move {
        match (answer.is_ok(), answer.value) {
            (true, DialogValue::Index(index)) => f(index).await,
            (true, other) => log::warn!("Dialog answered with {:?}, expected an index", other),
            _ => {}
        }
    })
}

/// Run `f` with the text when a text or editable list dialog was validated.
pub fn on_valid_string<F, Fut>(f: F) -> DialogCallback
where
    F: FnOnce(String) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    dialog_callback(move |answer: DialogAnswer| async move {
        match (answer.is_ok(), answer.value) {
            (true, DialogValue::Text(text)) => f(text).await,
            (true, other) => log::warn!("Dialog answered with {:?}, expected a string", other),
            _ => {}
        }
    })
}

/// How the value of `on_answer_dialog` must be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WidgetKind {
    None,
    Text,
    Scale,
    EditableList,
    FixedList,
}

impl WidgetKind {
    pub(crate) fn read(self, value: &Value) -> dockbus::value::Result<DialogValue> {
        Ok(match self {
            WidgetKind::None => DialogValue::None,
            WidgetKind::Text | WidgetKind::EditableList => DialogValue::Text(value.as_string()?),
            WidgetKind::Scale => DialogValue::Float(value.as_f64()?),
            WidgetKind::FixedList => DialogValue::Index(value.as_i32()?),
        })
    }
}

fn map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<BTreeMap<_, _>>())
}

impl DialogData {
    pub(crate) fn widget_kind(&self) -> WidgetKind {
        match &self.widget {
            None => WidgetKind::None,
            Some(DialogWidget::Text(_)) => WidgetKind::Text,
            Some(DialogWidget::Scale(_)) => WidgetKind::Scale,
            Some(DialogWidget::List(list)) if list.editable => WidgetKind::EditableList,
            Some(DialogWidget::List(_)) => WidgetKind::FixedList,
        }
    }

    /// The two `a{sv}` arguments of `PopupDialog`: the dialog attributes and the widget attributes.
    pub(crate) fn to_args(&self) -> Vec<Value> {
        let dialog = map(vec![
            ("message", self.message.clone().into()),
            ("icon", self.icon.clone().into()),
            ("time-length", self.time_length.into()),
            ("force-above", self.force_above.into()),
            ("use-markup", self.use_markup.into()),
            ("buttons", self.buttons.clone().into()),
        ]);
        let widget = match &self.widget {
            None => map(vec![]),
            Some(DialogWidget::Text(w)) => map(vec![
                ("widget-type", "text-entry".into()),
                ("multi-lines", w.multi_lines.into()),
                ("editable", (!w.locked).into()),
                ("visible", (!w.hidden).into()),
                ("nb-chars", w.nb_chars.into()),
                ("initial-value", w.initial_value.clone().into()),
            ]),
            Some(DialogWidget::Scale(w)) => map(vec![
                ("widget-type", "scale".into()),
                ("min-value", w.min_value.into()),
                ("max-value", w.max_value.into()),
                ("nb-digit", w.nb_digit.into()),
                ("initial-value", w.initial_value.into()),
                ("min-label", w.min_label.clone().into()),
                ("max-label", w.max_label.clone().into()),
            ]),
            Some(DialogWidget::List(w)) => {
                let mut entries: Vec<(&str, Value)> = vec![
                    ("widget-type", "list".into()),
                    ("editable", w.editable.into()),
                    ("values", w.values.join(";").into()),
                ];
                match &w.initial {
                    ListInitial::None => {}
                    ListInitial::Index(index) => entries.push(("initial-value", (*index).into())),
                    ListInitial::Text(text) => entries.push(("initial-value", text.clone().into())),
                }
                map(entries)
            }
        };
        vec![dialog, widget]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_widget_kind_reads_value() {
        let list = DialogData {
            widget: Some(DialogWidget::List(ListWidget { values: vec!["a".into(), "b".into()], ..Default::default() })),
            ..Default::default()
        };
        assert_eq!(list.widget_kind(), WidgetKind::FixedList);
        assert_eq!(WidgetKind::FixedList.read(&Value::Int(1)).unwrap(), DialogValue::Index(1));
        assert_eq!(WidgetKind::EditableList.read(&Value::from("c")).unwrap(), DialogValue::Text("c".into()));
        assert_eq!(WidgetKind::Scale.read(&Value::Float(0.5)).unwrap(), DialogValue::Float(0.5));
        assert_eq!(WidgetKind::None.read(&Value::from("")).unwrap(), DialogValue::None);
    }

    #[test]
    fn test_list_args() {
        let data = DialogData {
            message: "Pick".into(),
            buttons: "ok;cancel".into(),
            widget: Some(DialogWidget::List(ListWidget {
                editable: false,
                values: vec!["one".into(), "two".into()],
                initial: ListInitial::Index(1),
            })),
            ..Default::default()
        };
        let args = data.to_args();
        insta::assert_snapshot!(args[0], @"{buttons: ok;cancel, force-above: false, icon: , message: Pick, time-length: 0, use-markup: false}");
        insta::assert_snapshot!(args[1], @"{editable: false, initial-value: 1, values: one;two, widget-type: list}");
    }

    #[tokio::test]
    async fn test_on_ok_ignores_cancel() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tx2 = tx.clone();
        on_ok(move || async move { tx.send("first").unwrap() })(DialogAnswer { button: -2, value: DialogValue::None }).await;
        on_ok(move || async move { tx2.send("second").unwrap() })(DialogAnswer { button: -1, value: DialogValue::None }).await;
        assert_eq!(rx.recv().await, Some("second"));
        assert!(rx.try_recv().is_err());
    }
}
