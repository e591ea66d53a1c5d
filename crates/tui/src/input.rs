use gamefinder_core::validation::{FormField, LoginForm, RegisterForm, ValidationError};

const MAX_FIELD_LEN: usize = 128;

/// Single-line text input with a char-indexed cursor.
#[derive(Debug, Clone)]
pub struct TextField {
    pub field: FormField,
    input: String,
    cursor: usize,
}

impl TextField {
    pub fn new(field: FormField) -> Self {
        Self {
            field,
            input: String::new(),
            cursor: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.field {
            FormField::Name => "Name",
            FormField::Email => "E-mail",
            FormField::Password => "Password",
            FormField::ConfirmPassword => "Confirm password",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(
            self.field,
            FormField::Password | FormField::ConfirmPassword
        )
    }

    /// Text as shown on screen; secrets are masked.
    pub fn display(&self) -> String {
        if self.is_secret() {
            "•".repeat(self.len())
        } else {
            self.input.clone()
        }
    }

    pub fn value(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn insert(&mut self, ch: char) {
        if self.len() >= MAX_FIELD_LEN || ch.is_control() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Login,
    Register,
}

/// Credentials submitted from a [`FormState`].
#[derive(Debug, Clone)]
pub enum Credentials {
    Login(LoginForm),
    Register(RegisterForm),
}

/// Login or registration form shown on the account screen.
#[derive(Debug, Clone)]
pub struct FormState {
    pub kind: FormKind,
    pub fields: Vec<TextField>,
    pub focus: usize,
    pub error: Option<String>,
    pub submitting: bool,
}

impl FormState {
    pub fn new(kind: FormKind) -> Self {
        let fields = match kind {
            FormKind::Login => vec![FormField::Email, FormField::Password],
            FormKind::Register => vec![
                FormField::Name,
                FormField::Email,
                FormField::Password,
                FormField::ConfirmPassword,
            ],
        };
        Self {
            kind,
            fields: fields.into_iter().map(TextField::new).collect(),
            focus: 0,
            error: None,
            submitting: false,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            FormKind::Login => "Sign in",
            FormKind::Register => "Create account",
        }
    }

    /// Switch between login and registration, keeping the e-mail typed so far.
    pub fn toggled(&self) -> Self {
        let kind = match self.kind {
            FormKind::Login => FormKind::Register,
            FormKind::Register => FormKind::Login,
        };
        let mut next = Self::new(kind);
        let email = self.value(FormField::Email).to_string();
        if let Some(field) = next.field_mut(FormField::Email) {
            email.chars().for_each(|ch| field.insert(ch));
        }
        next
    }

    pub fn focused_mut(&mut self) -> Option<&mut TextField> {
        self.fields.get_mut(self.focus)
    }

    pub fn move_focus(&mut self, delta: isize) {
        let total = self.fields.len() as isize;
        if total == 0 {
            return;
        }
        self.focus = (self.focus as isize + delta).rem_euclid(total) as usize;
    }

    fn field_mut(&mut self, field: FormField) -> Option<&mut TextField> {
        self.fields.iter_mut().find(|f| f.field == field)
    }

    fn value(&self, field: FormField) -> &str {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(TextField::value)
            .unwrap_or("")
    }

    /// Validate locally; on failure the offending field gains focus.
    pub fn credentials(&mut self) -> Result<Credentials, ValidationError> {
        let credentials = match self.kind {
            FormKind::Login => {
                let form = LoginForm {
                    email: self.value(FormField::Email).to_string(),
                    password: self.value(FormField::Password).to_string(),
                };
                form.validate().map(|_| Credentials::Login(form))
            }
            FormKind::Register => {
                let form = RegisterForm {
                    name: self.value(FormField::Name).to_string(),
                    email: self.value(FormField::Email).to_string(),
                    password: self.value(FormField::Password).to_string(),
                    confirm_password: self.value(FormField::ConfirmPassword).to_string(),
                };
                form.validate().map(|_| Credentials::Register(form))
            }
        };
        if let Err(err) = &credentials {
            if let Some(idx) = self.fields.iter().position(|f| f.field == err.field) {
                self.focus = idx;
            }
            self.error = Some(err.message.clone());
        }
        credentials
    }
}
