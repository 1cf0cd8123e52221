use std::fmt;

/// Handle returned by [`Subscribers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// Observer list keyed by subscription token.
pub struct Subscribers<A: ?Sized> {
    next_token: u64,
    handlers: Vec<(SubscriptionToken, Box<dyn FnMut(&A)>)>,
}

impl<A: ?Sized> Default for Subscribers<A> {
    fn default() -> Self {
        Self {
            next_token: 0,
            handlers: Vec::new(),
        }
    }
}

impl<A: ?Sized> fmt::Debug for Subscribers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.handlers.len())
            .finish()
    }
}

impl<A: ?Sized> Subscribers<A> {
    pub fn subscribe(&mut self, handler: impl FnMut(&A) + 'static) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.handlers.push((token, Box::new(handler)));
        token
    }

    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != token);
        before != self.handlers.len()
    }

    pub fn notify(&mut self, args: &A) {
        for (_, handler) in &mut self.handlers {
            handler(args);
        }
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        !self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
