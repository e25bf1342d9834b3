#![no_main]

use libfuzzer_sys::arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use ysql_creds::{UsernameMetadata, UsernameTemplate};

#[derive(Debug)]
struct TemplateInput {
    template: String,
    display_name: String,
    role_name: String,
}

impl<'a> Arbitrary<'a> for TemplateInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> libfuzzer_sys::arbitrary::Result<Self> {
        Ok(Self {
            template: u.arbitrary()?,
            display_name: u.arbitrary()?,
            role_name: u.arbitrary()?,
        })
    }
}

fuzz_target!(|input: TemplateInput| {
    if input.template.len() > 256 {
        return;
    }
    if let Ok(template) = UsernameTemplate::compile(&input.template) {
        let metadata = UsernameMetadata::new(input.display_name, input.role_name);
        if let Ok(name) = template.render_identifier(&metadata) {
            assert!(!name.is_empty() && name.len() <= ysql_creds::username::MAX_IDENTIFIER_LEN);
        }
    }
});
