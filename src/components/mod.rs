pub mod answer_panel;
pub mod article_panel;
pub mod graph_view;
pub mod help_panel;
pub mod node_panel;
