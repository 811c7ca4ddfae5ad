use folio_core_contact_impl::ContactFeatureServiceImpl;
use folio_email_impl::EmailServiceImpl;

// API
pub type RestServer = folio_api_rest::RestServer<ContactFeature>;

// Email
pub type Email = EmailServiceImpl;

// Core
pub type ContactFeature = ContactFeatureServiceImpl<Email>;
