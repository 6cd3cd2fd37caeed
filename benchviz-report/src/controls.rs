//! Checkbox and radio controls that drive the filter pipeline

use crate::metadata::MetadataEntry;
use serde::Serialize;

/// Input names of the built-in control groups
pub const HISTORY: &str = "history";
pub const SIZE: &str = "size";
pub const SOLVER: &str = "solver";
pub const LAYOUT: &str = "layout";
pub const FIELD: &str = "field";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Checkbox,
    Radio,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Checkbox => write!(f, "checkbox"),
            InputKind::Radio => write!(f, "radio"),
        }
    }
}

/// Whether options sit on one line (`span`) or one per line (`div`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionLayout {
    Inline,
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlOption {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

impl ControlOption {
    pub fn new<V: Into<String>, L: Into<String>>(value: V, label: L, checked: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            checked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlGroup {
    /// `name` attribute of every input in the group
    pub name: String,
    pub legend: String,
    pub kind: InputKind,
    pub layout: OptionLayout,
    pub options: Vec<ControlOption>,
}

impl ControlGroup {
    pub fn position(&self, value: &str) -> Option<usize> {
        self.options.iter().position(|o| o.value == value)
    }

    /// Value of the first checked option, for radio groups
    pub fn checked_value(&self) -> Option<&str> {
        self.options.iter().find(|o| o.checked).map(|o| o.value.as_str())
    }
}

/// Collapses raw test names into the solver names shown as controls
pub trait Renamer: Send + Sync {
    fn rename(&self, name: &str) -> String;
}

impl<F> Renamer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn rename(&self, name: &str) -> String {
        self(name)
    }
}

/// Keeps names unchanged
pub struct IdentityRenamer;

impl Renamer for IdentityRenamer {
    fn rename(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Strips the first layout token and everything after it:
/// `jacobiSolverDenseMatrix` becomes `jacobiSolver`.
pub struct LayoutRenamer {
    layouts: Vec<String>,
}

impl LayoutRenamer {
    pub fn new(layouts: &[String]) -> Self {
        Self {
            layouts: layouts.to_vec(),
        }
    }
}

impl Renamer for LayoutRenamer {
    fn rename(&self, name: &str) -> String {
        let cut = self
            .layouts
            .iter()
            .filter_map(|layout| name.find(layout.as_str()))
            .min();
        match cut {
            Some(0) | None => name.to_string(),
            Some(index) => name[..index].to_string(),
        }
    }
}

/// A caller-provided group spliced in at `position`
#[derive(Debug, Clone)]
pub struct ExtraControl {
    pub position: usize,
    pub group: ControlGroup,
}

/// Checkbox group for memory layouts, all checked
pub fn layout_control(layouts: &[String]) -> ControlGroup {
    ControlGroup {
        name: LAYOUT.to_string(),
        legend: LAYOUT.to_string(),
        kind: InputKind::Checkbox,
        layout: OptionLayout::Inline,
        options: layouts
            .iter()
            .map(|layout| ControlOption::new(layout.as_str(), layout.as_str(), true))
            .collect(),
    }
}

/// Radio group for the measured field, `selected` checked
pub fn field_control<S: AsRef<str>>(choices: &[S], selected: &str) -> ControlGroup {
    ControlGroup {
        name: FIELD.to_string(),
        legend: FIELD.to_string(),
        kind: InputKind::Radio,
        layout: OptionLayout::Inline,
        options: choices
            .iter()
            .map(|choice| {
                let choice = choice.as_ref();
                ControlOption::new(choice, choice, choice == selected)
            })
            .collect(),
    }
}

/// The full control form of a page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlPanel {
    pub groups: Vec<ControlGroup>,
    /// For every test index of the charts, the solver option covering it
    #[serde(skip)]
    pub solver_of_test: Vec<usize>,
}

impl ControlPanel {
    pub fn group(&self, name: &str) -> Option<&ControlGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut ControlGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    /// Render `<form>` markup; `disabled` freezes the inputs for static pages
    pub fn render_html(&self, disabled: bool) -> String {
        let fieldsets: Vec<String> = self
            .groups
            .iter()
            .map(|group| render_group(group, disabled))
            .collect();
        format!("<form>{}</form>", fieldsets.join("\n"))
    }
}

fn render_group(group: &ControlGroup, disabled: bool) -> String {
    let tag = match group.layout {
        OptionLayout::Inline => "span",
        OptionLayout::Block => "div",
    };

    let mut content = String::new();
    for (i, option) in group.options.iter().enumerate() {
        let id = format!("{}-{}", escape_html(&group.name), i);
        content.push_str(&format!(
            r#"<{tag}><input id="{id}" name="{name}" type="{kind}" value="{value}"{checked}{disabled}><label for="{id}">{label}</label></{tag}>"#,
            tag = tag,
            id = id,
            name = escape_html(&group.name),
            kind = group.kind,
            value = escape_html(&option.value),
            checked = if option.checked { " checked" } else { "" },
            disabled = if disabled { " disabled" } else { "" },
            label = escape_html(&option.label),
        ));
    }

    format!(
        "<fieldset><legend>{}</legend>{}</fieldset>",
        escape_html(&group.legend),
        content
    )
}

/// Build the history, size and solver groups, then splice in `extra`.
///
/// Solver options are the renamed test names, deduplicated in first-seen
/// order; `solver_of_test` records which option each test maps to.
pub fn build_controls(
    metadata: &[MetadataEntry],
    runs: usize,
    renamer: &dyn Renamer,
    extra: Vec<ExtraControl>,
) -> ControlPanel {
    let history = ControlGroup {
        name: HISTORY.to_string(),
        legend: HISTORY.to_string(),
        kind: InputKind::Checkbox,
        layout: OptionLayout::Inline,
        options: (0..runs)
            .map(|i| ControlOption::new(i.to_string(), i.to_string(), true))
            .collect(),
    };

    let data_size = ControlGroup {
        name: SIZE.to_string(),
        legend: "dataSize".to_string(),
        kind: InputKind::Checkbox,
        layout: OptionLayout::Inline,
        options: metadata
            .iter()
            .enumerate()
            .map(|(i, entry)| ControlOption::new(i.to_string(), entry.size.to_string(), true))
            .collect(),
    };

    let mut solvers: Vec<String> = Vec::new();
    let mut solver_of_test = Vec::new();
    if let Some(first) = metadata.first() {
        for name in &first.names {
            let renamed = renamer.rename(name);
            let index = match solvers.iter().position(|s| *s == renamed) {
                Some(index) => index,
                None => {
                    solvers.push(renamed);
                    solvers.len() - 1
                }
            };
            solver_of_test.push(index);
        }
    }

    let solver = ControlGroup {
        name: SOLVER.to_string(),
        legend: "solvers".to_string(),
        kind: InputKind::Checkbox,
        layout: OptionLayout::Block,
        options: solvers
            .iter()
            .enumerate()
            .map(|(i, name)| ControlOption::new(i.to_string(), name.as_str(), true))
            .collect(),
    };

    let mut groups = vec![history, data_size, solver];
    for ExtraControl { position, group } in extra {
        let position = position.min(groups.len());
        groups.insert(position, group);
    }

    ControlPanel {
        groups,
        solver_of_test,
    }
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TimeUnit;
    use crate::palette::Color;

    fn metadata(names: &[&str], sizes: &[i64]) -> Vec<MetadataEntry> {
        sizes
            .iter()
            .map(|&size| MetadataEntry {
                size,
                names: names.iter().map(|n| n.to_string()).collect(),
                time_units: vec![TimeUnit::Ns; names.len()],
                colors: vec![Color::rgb(0, 0, 0); names.len()],
            })
            .collect()
    }

    #[test]
    fn test_default_groups() {
        let panel = build_controls(&metadata(&["a", "b"], &[32, 64]), 3, &IdentityRenamer, vec![]);
        let names: Vec<&str> = panel.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec![HISTORY, SIZE, SOLVER]);

        assert_eq!(panel.group(HISTORY).unwrap().options.len(), 3);
        let sizes = panel.group(SIZE).unwrap();
        assert_eq!(sizes.options[1].value, "1");
        assert_eq!(sizes.options[1].label, "64");
        assert_eq!(panel.solver_of_test, vec![0, 1]);
    }

    #[test]
    fn test_layout_renamer_collapses_solvers() {
        let layouts = vec!["Dense".to_string(), "Sparse".to_string()];
        let renamer = LayoutRenamer::new(&layouts);
        assert_eq!(renamer.rename("jacobiSolverDenseMatrix"), "jacobiSolver");
        assert_eq!(renamer.rename("jacobiSparseMatrix"), "jacobi");
        assert_eq!(renamer.rename("conjugateGradient"), "conjugateGradient");

        let names = ["gaussDense", "gaussSparse", "cgDense", "cgSparse"];
        let panel = build_controls(
            &metadata(&names, &[32]),
            1,
            &renamer,
            vec![ExtraControl {
                position: 2,
                group: layout_control(&layouts),
            }],
        );

        let solver_labels: Vec<&str> = panel
            .group(SOLVER)
            .unwrap()
            .options
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(solver_labels, vec!["gauss", "cg"]);
        assert_eq!(panel.solver_of_test, vec![0, 0, 1, 1]);
        assert_eq!(panel.groups[2].name, LAYOUT);
        assert_eq!(panel.groups[3].name, SOLVER);
    }

    #[test]
    fn test_closure_renamer() {
        let upper = |name: &str| name.to_uppercase();
        let panel = build_controls(&metadata(&["a", "A"], &[1]), 1, &upper, vec![]);
        assert_eq!(panel.group(SOLVER).unwrap().options.len(), 1);
        assert_eq!(panel.solver_of_test, vec![0, 0]);
    }

    #[test]
    fn test_extra_position_clamped() {
        let panel = build_controls(
            &metadata(&["a"], &[1]),
            1,
            &IdentityRenamer,
            vec![ExtraControl {
                position: 99,
                group: field_control(&["real_time", "cpu_time"], "cpu_time"),
            }],
        );
        let field = panel.groups.last().unwrap();
        assert_eq!(field.name, FIELD);
        assert_eq!(field.kind, InputKind::Radio);
        assert_eq!(field.checked_value(), Some("cpu_time"));
    }

    #[test]
    fn test_render_html() {
        let panel = build_controls(&metadata(&["<a&b>"], &[8]), 1, &IdentityRenamer, vec![]);
        let html = panel.render_html(false);
        assert!(html.starts_with("<form><fieldset><legend>history</legend>"));
        assert!(html.contains(r#"<span><input id="history-0" name="history" type="checkbox" value="0" checked><label for="history-0">0</label></span>"#));
        assert!(html.contains("<legend>dataSize</legend>"));
        assert!(html.contains("<div><input"));
        assert!(html.contains("&lt;a&amp;b&gt;"));
        assert!(!html.contains(" disabled"));

        assert!(panel.render_html(true).contains(" checked disabled>"));
    }

    #[test]
    fn test_empty_metadata() {
        let panel = build_controls(&[], 0, &IdentityRenamer, vec![]);
        assert!(panel.group(SOLVER).unwrap().options.is_empty());
        assert!(panel.solver_of_test.is_empty());
    }
}
