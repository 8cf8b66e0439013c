use serde::Serialize;

/// Action ids of the survey interactions. The decode side matches on these,
/// so they are part of the wire contract, not presentation detail.
pub const ACTION_SHOW_FEEDBACK_FORM: &str = "show_feedback_form";
pub const ACTION_RATING_SELECT: &str = "rating_select";
pub const ACTION_FEEDBACK_TEXT: &str = "feedback_text";
pub const ACTION_SUBMIT_FEEDBACK: &str = "submit_feedback";

/// Block id of the form's text input. Pinned because submit payloads carry
/// the entered text under `state.values.<block_id>.<action_id>.value`.
pub const FEEDBACK_INPUT_BLOCK_ID: &str = "feedback_block";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    // the chat API's tag for plain text is `plain_text`, not `plain`
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: TextObject::plain(label), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaticSelectElement {
    pub action_id: String,
    pub placeholder: TextObject,
    pub options: Vec<SelectOption>,
}

impl StaticSelectElement {
    pub fn new(action_id: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            placeholder: TextObject::plain(placeholder),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(SelectOption::new(label, value));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlainTextInputElement {
    pub action_id: String,
    pub multiline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
}

impl PlainTextInputElement {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), multiline: false, placeholder: None }
    }

    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(TextObject::plain(placeholder));
        self
    }
}

/// Interactive element, tagged the way the chat API expects (`"type":
/// "button"` and friends).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button(ButtonElement),
    StaticSelect(StaticSelectElement),
    PlainTextInput(PlainTextInputElement),
}

impl From<ButtonElement> for BlockElement {
    fn from(element: ButtonElement) -> Self {
        Self::Button(element)
    }
}

impl From<StaticSelectElement> for BlockElement {
    fn from(element: StaticSelectElement) -> Self {
        Self::StaticSelect(element)
    }
}

impl From<PlainTextInputElement> for BlockElement {
    fn from(element: PlainTextInputElement) -> Self {
        Self::PlainTextInput(element)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        block_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<BlockElement>,
    },
    Input {
        block_id: String,
        label: TextObject,
        element: BlockElement,
    },
    Actions {
        block_id: String,
        elements: Vec<BlockElement>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        let (text, accessory) = builder.build();
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory });
        self
    }

    pub fn input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: impl Into<BlockElement>,
    ) -> Self {
        self.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element: element.into(),
        });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    accessory: Option<BlockElement>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn accessory(&mut self, element: impl Into<BlockElement>) -> &mut Self {
        self.accessory = Some(element.into());
        self
    }

    fn build(self) -> (TextObject, Option<BlockElement>) {
        (self.text.unwrap_or_else(|| TextObject::plain("")), self.accessory)
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<BlockElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(BlockElement::Button(button));
        self
    }

    fn build(self) -> Vec<BlockElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Yes button posted into the thread when the trigger phrase is seen.
pub fn survey_offer_message() -> MessageTemplate {
    MessageBuilder::new("Would you like to provide feedback?")
        .section("survey.offer.v1", |section| {
            section.mrkdwn("Would you like to provide feedback?").accessory(
                ButtonElement::new(ACTION_SHOW_FEEDBACK_FORM, "Yes").style(ButtonStyle::Primary),
            );
        })
        .build()
}

/// The survey form: 1-10 rating select, optional multiline comment, submit.
pub fn feedback_form_message() -> MessageTemplate {
    let mut rating_select = StaticSelectElement::new(ACTION_RATING_SELECT, "Select a rating");
    for value in 1..=10 {
        rating_select = rating_select.option(value.to_string(), value.to_string());
    }

    MessageBuilder::new("Please provide your feedback")
        .section("survey.form.rating.v1", |section| {
            section.mrkdwn("*Rate your experience (1-10):*").accessory(rating_select);
        })
        .input(
            FEEDBACK_INPUT_BLOCK_ID,
            "Feedback (optional)",
            PlainTextInputElement::new(ACTION_FEEDBACK_TEXT)
                .multiline()
                .placeholder("Your feedback here..."),
        )
        .actions("survey.form.actions.v1", |actions| {
            actions.button(
                ButtonElement::new(ACTION_SUBMIT_FEEDBACK, "Submit Feedback")
                    .style(ButtonStyle::Primary),
            );
        })
        .build()
}

/// In-place replacement for the form once the submission is recorded.
pub fn confirmation_message(display_name: &str) -> MessageTemplate {
    MessageBuilder::new("Feedback submitted ✅")
        .section("survey.confirmation.v1", |section| {
            section
                .mrkdwn(format!("Thank you, *{display_name}*! Your feedback has been recorded."));
        })
        .build()
}
