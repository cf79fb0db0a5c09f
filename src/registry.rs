use crate::option::ConfigurationOption;
use crate::types::OPTION_FLAG_REQUEST;

/// Options owned by one protocol instance. Registration order is the order
/// options are encoded on the wire.
#[derive(Default)]
pub struct OptionRegistry {
    options: Vec<Box<dyn ConfigurationOption>>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `option`. Refuses an id that is already registered.
    pub fn register(&mut self, option: Box<dyn ConfigurationOption>) -> bool {
        if self.find(option.id()).is_some() {
            return false;
        }
        self.options.push(option);
        true
    }

    pub fn find(&self, id: u8) -> Option<&dyn ConfigurationOption> {
        self.options
            .iter()
            .find(|opt| opt.id() == id)
            .map(|opt| &**opt)
    }

    pub fn find_mut(&mut self, id: u8) -> Option<&mut (dyn ConfigurationOption + 'static)> {
        self.options
            .iter_mut()
            .find(|opt| opt.id() == id)
            .map(|opt| &mut **opt)
    }

    pub fn position(&self, id: u8) -> Option<usize> {
        self.options.iter().position(|opt| opt.id() == id)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn ConfigurationOption + 'static)> {
        self.options.get_mut(index).map(|opt| &mut **opt)
    }

    /// Mark `id` to be included in our Configure-Requests.
    pub fn request(&mut self, id: u8) -> bool {
        match self.find_mut(id) {
            Some(opt) => {
                opt.negotiation_mut().flags_local |= OPTION_FLAG_REQUEST;
                true
            }
            None => false,
        }
    }

    pub fn clear_requests(&mut self) {
        for opt in &mut self.options {
            opt.negotiation_mut().flags_local &= !OPTION_FLAG_REQUEST;
        }
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&dyn ConfigurationOption),
    {
        for opt in &self.options {
            f(&**opt);
        }
    }

    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn ConfigurationOption),
    {
        for opt in &mut self.options {
            f(&mut **opt);
        }
    }

    pub fn ids(&self) -> Vec<u8> {
        self.options.iter().map(|opt| opt.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
