use bon::Builder;
use serde::Serialize;

/// Kind of node the button is rendered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonRootNode {
    ShadowRoot,
    Document,
    /// Anything else the merchant passed.
    Other,
}

/// Options passed to `createButton`. Values are kept as given so unknown
/// ones can be reported before they are normalized.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Default)]
pub struct ButtonOptions {
    #[builder(into)]
    pub button_type: Option<String>,
    #[builder(into)]
    pub button_color: Option<String>,
    #[builder(into)]
    pub button_size_mode: Option<String>,
    pub button_root_node: Option<ButtonRootNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonType {
    Short,
    #[default]
    Long,
    Plain,
    Buy,
    Donate,
    Book,
    Checkout,
    Order,
    Pay,
    Subscribe,
}

impl ButtonType {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "short" => ButtonType::Short,
            "long" => ButtonType::Long,
            "plain" => ButtonType::Plain,
            "buy" => ButtonType::Buy,
            "donate" => ButtonType::Donate,
            "book" => ButtonType::Book,
            "checkout" => ButtonType::Checkout,
            "order" => ButtonType::Order,
            "pay" => ButtonType::Pay,
            "subscribe" => ButtonType::Subscribe,
            _ => return None,
        })
    }

    fn telemetry_code(&self) -> u8 {
        match self {
            ButtonType::Short => 1,
            ButtonType::Long => 2,
            ButtonType::Plain => 3,
            ButtonType::Buy => 4,
            ButtonType::Donate => 5,
            ButtonType::Book => 6,
            ButtonType::Checkout => 7,
            ButtonType::Order => 8,
            ButtonType::Pay => 9,
            ButtonType::Subscribe => 10,
        }
    }
}

/// `Default` renders black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonColor {
    #[default]
    Black,
    White,
}

impl ButtonColor {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "default" | "black" => Some(ButtonColor::Black),
            "white" => Some(ButtonColor::White),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonSizeMode {
    #[default]
    Static,
    Fill,
}

impl ButtonSizeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "static" => Some(ButtonSizeMode::Static),
            "fill" => Some(ButtonSizeMode::Fill),
            _ => None,
        }
    }
}

/// Button options after defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonStyle {
    pub button_type: ButtonType,
    pub button_color: ButtonColor,
    pub button_size_mode: ButtonSizeMode,
}

impl ButtonOptions {
    /// Unknown or missing values fall back to a long, black, static button.
    pub fn style(&self) -> ButtonStyle {
        ButtonStyle {
            button_type: self
                .button_type
                .as_deref()
                .and_then(ButtonType::parse)
                .unwrap_or_default(),
            button_color: self
                .button_color
                .as_deref()
                .and_then(ButtonColor::parse)
                .unwrap_or_default(),
            button_size_mode: self
                .button_size_mode
                .as_deref()
                .and_then(ButtonSizeMode::parse)
                .unwrap_or_default(),
        }
    }
}

/// Telemetry projection of [`ButtonOptions`]. Zero means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonInfo {
    pub button_type: u8,
    pub button_size_mode: u8,
    pub button_root_node: u8,
}

impl From<&ButtonOptions> for ButtonInfo {
    fn from(options: &ButtonOptions) -> Self {
        ButtonInfo {
            button_type: options
                .button_type
                .as_deref()
                .and_then(ButtonType::parse)
                .map_or(0, |t| t.telemetry_code()),
            button_size_mode: match options
                .button_size_mode
                .as_deref()
                .and_then(ButtonSizeMode::parse)
            {
                Some(ButtonSizeMode::Static) => 1,
                Some(ButtonSizeMode::Fill) => 2,
                None => 0,
            },
            button_root_node: match options.button_root_node {
                None => 0,
                Some(ButtonRootNode::ShadowRoot) => 1,
                Some(ButtonRootNode::Document) => 2,
                Some(ButtonRootNode::Other) => 3,
            },
        }
    }
}
