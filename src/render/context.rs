use crate::config::Theme;
use crate::value::TypeClass;
use ratatui::style::Color;

/// Snapshot of theme colors and display configuration for rendering.
/// Passed to widgets to avoid threading many individual parameters.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub primary: Color,
    pub keybind_hints: Color,
    pub keybind_labels: Color,
    pub controls_bg: Color,
    pub background: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_inverse: Color,
    pub dimmed: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub modal_border: Color,
    pub modal_border_active: Color,
    pub modal_border_error: Color,
    pub surface: Color,
    pub throbber: Color,
    pub progress: Color,

    pub table_header: Color,
    pub table_header_bg: Color,
    pub column_separator: Color,
    pub alternate_row_color: Option<Color>,

    pub str_col: Color,
    pub int_col: Color,
    pub float_col: Color,
    pub bool_col: Color,
    pub temporal_col: Color,
    pub binary_col: Color,
    pub list_col: Color,
    pub struct_col: Color,

    pub table_cell_padding: u16,
    pub min_column_width: u16,
    pub column_colors: bool,
}

impl RenderContext {
    /// Build render context from app theme and config.
    /// This is a snapshot; changes to theme won't affect this instance.
    pub fn from_theme_and_config(
        theme: &Theme,
        table_cell_padding: u16,
        min_column_width: u16,
        column_colors: bool,
    ) -> Self {
        let type_color = |name: &str| {
            if column_colors {
                theme.get(name)
            } else {
                Color::Reset
            }
        };
        Self {
            primary: theme.get("primary"),
            keybind_hints: theme.get("keybind_hints"),
            keybind_labels: theme.get("keybind_labels"),
            controls_bg: theme.get("controls_bg"),
            background: theme.get("background"),
            text_primary: theme.get("text_primary"),
            text_secondary: theme.get("text_secondary"),
            text_inverse: theme.get("text_inverse"),
            dimmed: theme.get("dimmed"),
            success: theme.get("success"),
            warning: theme.get("warning"),
            error: theme.get("error"),
            modal_border: theme.get("modal_border"),
            modal_border_active: theme.get("modal_border_active"),
            modal_border_error: theme.get("modal_border_error"),
            surface: theme.get("surface"),
            throbber: theme.get("throbber"),
            progress: theme.get("progress"),

            table_header: theme.get("table_header"),
            table_header_bg: theme.get("table_header_bg"),
            column_separator: theme.get("column_separator"),
            alternate_row_color: theme.get_optional("alternate_row_color"),

            str_col: type_color("str_col"),
            int_col: type_color("int_col"),
            float_col: type_color("float_col"),
            bool_col: type_color("bool_col"),
            temporal_col: type_color("temporal_col"),
            binary_col: type_color("binary_col"),
            list_col: type_color("list_col"),
            struct_col: type_color("struct_col"),

            table_cell_padding,
            min_column_width,
            column_colors,
        }
    }

    /// Cell and badge color for a type class
    pub fn type_color(&self, class: TypeClass) -> Color {
        match class {
            TypeClass::Integer => self.int_col,
            TypeClass::Float => self.float_col,
            TypeClass::Text => self.str_col,
            TypeClass::Boolean => self.bool_col,
            TypeClass::Temporal => self.temporal_col,
            TypeClass::Binary => self.binary_col,
            TypeClass::List => self.list_col,
            TypeClass::Struct => self.struct_col,
            TypeClass::Other => Color::Reset,
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::from_theme_and_config(&Theme::default(), 2, 3, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_colors_off_resets_type_colors() {
        let ctx = RenderContext::from_theme_and_config(&Theme::default(), 2, 3, false);
        assert_eq!(ctx.type_color(TypeClass::Integer), Color::Reset);
        assert_eq!(ctx.type_color(TypeClass::Text), Color::Reset);
    }

    #[test]
    fn test_type_color_lookup() {
        let ctx = RenderContext::default();
        assert_eq!(ctx.type_color(TypeClass::Integer), ctx.int_col);
        assert_eq!(ctx.type_color(TypeClass::Struct), ctx.struct_col);
        assert_eq!(ctx.type_color(TypeClass::Other), Color::Reset);
    }
}
