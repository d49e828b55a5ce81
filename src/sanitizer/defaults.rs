/// JSON field names redacted out of the box.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    // Passwords
    "password",
    "passwd",
    "pwd",
    "user_password",
    "userpassword",
    "pass",
    "passphrase",
    "new_password",
    "old_password",
    "current_password",
    "password_hash",
    "passwordhash",
    // Secrets
    "secret",
    "secret_key",
    "secretkey",
    "client_secret",
    "clientsecret",
    "app_secret",
    "appsecret",
    "api_secret",
    "apisecret",
    // Tokens
    "token",
    "auth_token",
    "authtoken",
    "access_token",
    "accesstoken",
    "bearer_token",
    "bearertoken",
    "refresh_token",
    "refreshtoken",
    "id_token",
    "idtoken",
    "csrf_token",
    "csrftoken",
    "session_token",
    "sessiontoken",
    "jwt",
    "jwt_token",
    "oauth_token",
    "oauthtoken",
    // Keys
    "api_key",
    "apikey",
    "key",
    "private_key",
    "privatekey",
    "public_key",
    "publickey",
    "access_key",
    "accesskey",
    "secret_access_key",
    // Sessions
    "session",
    "session_id",
    "sessionid",
    "sessid",
    // Auth
    "auth",
    "authorization",
    "credentials",
    "credential",
    "pin",
    "security_answer",
    "securityanswer",
];

/// Header names redacted out of the box.
pub const DEFAULT_SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "qiscus-secret-key",
    "qiscus-app-secret",
    "x-api-key",
    "x-auth-token",
    "cookie",
    "set-cookie",
    "proxy-authorization",
    "www-authenticate",
];
