use tabled::{Table, settings::Style};

pub(crate) trait ResponderTable {
    fn styled(&mut self) -> &mut Self;
}

impl ResponderTable for Table {
    fn styled(&mut self) -> &mut Self {
        self.with(Style::psql())
    }
}
