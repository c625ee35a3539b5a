use resume_autofill::browser::dom::{Document, NodeId};

// =========================================================================
// Node helpers
// =========================================================================

pub fn el(doc: &mut Document, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
    doc.append_element(parent, tag, attrs)
}

pub fn text_el(doc: &mut Document, parent: NodeId, tag: &str, attrs: &[(&str, &str)], text: &str) -> NodeId {
    let id = doc.append_element(parent, tag, attrs);
    doc.node_mut(id).unwrap().text = text.to_string();
    id
}

pub fn hide(doc: &mut Document, id: NodeId) {
    doc.node_mut(id).unwrap().style.display = "none".to_string();
}

pub fn option(doc: &mut Document, select: NodeId, value: &str, text: &str) -> NodeId {
    text_el(doc, select, "option", &[("value", value)], text)
}

/// Locate the first element carrying `name=<name>`.
pub fn by_name(doc: &Document, name: &str) -> NodeId {
    doc.elements()
        .into_iter()
        .find(|id| doc.attr(*id, "name") == Some(name))
        .unwrap_or_else(|| panic!("no element named {}", name))
}

// =========================================================================
// Fixture pages
// =========================================================================

/// Single `<input name="email" placeholder="Email">` in an otherwise empty body.
pub fn email_page() -> Document {
    let mut doc = Document::new("https://careers.example.com/apply", "Apply");
    let body = doc.body();
    el(&mut doc, body, "input", &[("name", "email"), ("placeholder", "Email")]);
    doc
}

/// A conventional application form exercising each label rule.
///
/// Native match order: fullName(0), phone(1), gender(2), school(3),
/// ghost(4, hidden), intro(5). A `type=hidden` input is not a candidate.
pub fn application_form() -> Document {
    let mut doc = Document::new("https://careers.example.com/apply?job=42", "Campus application");
    let body = doc.body();
    let form = el(&mut doc, body, "form", &[("id", "apply")]);

    let row = el(&mut doc, form, "div", &[("class", "row")]);
    text_el(&mut doc, row, "label", &[("for", "fullName")], "姓名");
    el(&mut doc, row, "input", &[("id", "fullName"), ("name", "name"), ("type", "text")]);

    let row = el(&mut doc, form, "div", &[("class", "row")]);
    text_el(&mut doc, row, "span", &[], "手机号");
    el(&mut doc, row, "input", &[("name", "phone"), ("type", "tel")]);

    let row = el(&mut doc, form, "div", &[("class", "row")]);
    text_el(&mut doc, row, "span", &[], "性别");
    let gender = el(&mut doc, row, "select", &[("name", "gender")]);
    option(&mut doc, gender, "", "请选择");
    option(&mut doc, gender, "male", "男");
    option(&mut doc, gender, "female", "女");

    let row = el(&mut doc, form, "div", &[("class", "row")]);
    let wrap = el(&mut doc, row, "span", &[("class", "control")]);
    el(&mut doc, wrap, "input", &[("name", "school")]);
    text_el(&mut doc, row, "div", &[("class", "field-title")], "学校");

    el(&mut doc, form, "input", &[("type", "hidden"), ("name", "csrf")]);
    let ghost = el(&mut doc, form, "input", &[("type", "text"), ("name", "ghost")]);
    hide(&mut doc, ghost);

    let row = el(&mut doc, form, "div", &[("class", "row")]);
    text_el(&mut doc, row, "span", &[], "自我介绍");
    el(
        &mut doc,
        row,
        "textarea",
        &[("name", "intro"), ("placeholder", "Say something about yourself"), ("data-field", "self_intro")],
    );
    doc
}

/// Component-library markup as served by the custom-UI vendor sites.
///
/// Native: the mobile input (0). Custom: the plaintext editor (1004) and the
/// education dropdown trigger (2000).
pub fn component_form(url: &str) -> Document {
    let mut doc = Document::new(url, "Apply");
    let body = doc.body();

    let item = el(&mut doc, body, "div", &[("class", "ud-form-item")]);
    text_el(&mut doc, item, "div", &[("class", "ud-form-item-label")], "手机号码");
    let wrapper = el(&mut doc, item, "div", &[("class", "ud-input-wrapper")]);
    el(&mut doc, wrapper, "input", &[("class", "ud-input"), ("type", "text"), ("name", "mobile")]);

    let item = el(&mut doc, body, "div", &[("class", "ud-form-item")]);
    text_el(&mut doc, item, "div", &[("class", "ud-form-item-label")], "个人简介");
    el(
        &mut doc,
        item,
        "div",
        &[("class", "ud-editor"), ("contenteditable", "plaintext-only"), ("aria-label", "intro")],
    );

    let item = el(&mut doc, body, "div", &[("class", "ud-form-item")]);
    text_el(&mut doc, item, "div", &[("class", "ud-form-item-label")], "学历");
    let select = el(&mut doc, item, "div", &[("class", "ud-select")]);
    text_el(&mut doc, select, "span", &[("class", "ud-select-trigger")], "请选择");

    doc
}

/// One text input bound to a reactive framework.
pub fn reactive_page() -> (Document, NodeId) {
    let mut doc = Document::new("https://careers.example.com/spa", "SPA");
    let body = doc.body();
    text_el(&mut doc, body, "label", &[("for", "mail")], "邮箱");
    let input = el(&mut doc, body, "input", &[("id", "mail"), ("name", "email"), ("type", "email")]);
    doc.bind_reactive(input).unwrap();
    (doc, input)
}

/// Targets for pointer mode: a nested input, a plain paragraph, a select.
pub fn pointer_page() -> Document {
    let mut doc = Document::new("https://careers.example.com/apply", "Apply");
    let body = doc.body();
    let card = el(&mut doc, body, "div", &[("class", "card")]);
    el(&mut doc, card, "input", &[("name", "city"), ("type", "text")]);
    text_el(&mut doc, body, "p", &[("class", "hint")], "Fill in your details");
    let degree = el(&mut doc, body, "select", &[("name", "degree")]);
    option(&mut doc, degree, "bachelor", "本科");
    option(&mut doc, degree, "master", "硕士");
    doc
}
